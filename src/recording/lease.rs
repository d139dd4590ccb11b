use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::audio::{CaptureBackend, CaptureHandle};

/// Exclusive ownership of an open capture.
///
/// The capture is released exactly once: either explicitly through
/// [`CaptureLease::release`] or, if the lease is dropped while still held,
/// by a release task spawned on the current runtime.
pub(crate) struct CaptureLease {
    backend: Arc<dyn CaptureBackend>,
    handle: CaptureHandle,
    released: bool,
}

impl CaptureLease {
    pub(crate) fn new(backend: Arc<dyn CaptureBackend>, handle: CaptureHandle) -> Self {
        Self {
            backend,
            handle,
            released: false,
        }
    }

    pub(crate) fn handle(&self) -> &CaptureHandle {
        &self.handle
    }

    pub(crate) async fn release(mut self) -> Result<()> {
        let result = self.backend.release(&self.handle).await;
        self.released = true;
        debug!(handle = %self.handle, ok = result.is_ok(), "capture released");
        result
    }
}

impl Drop for CaptureLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let backend = Arc::clone(&self.backend);
        let handle = self.handle.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(%handle, "releasing capture from drop guard");
                runtime.spawn(async move {
                    if let Err(e) = backend.release(&handle).await {
                        warn!(%handle, "Failed to release capture on drop: {:#}", e);
                    }
                });
            }
            Err(_) => {
                warn!(%handle, "no runtime available, capture could not be released");
            }
        }
    }
}
