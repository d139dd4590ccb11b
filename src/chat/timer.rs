use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A single owned, cancellable delay.
///
/// Scheduling always aborts the previously pending task before spawning a
/// new one, so at most one expiry can be outstanding. Each schedule gets a
/// new generation number; an expiry handler must call [`DebounceTimer::complete`]
/// with its generation and bail out if that returns false, which covers a
/// task that woke up just before being superseded.
#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    generation: u64,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            generation: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending expiry and start counting down from zero.
    ///
    /// `on_expire` receives the generation of this schedule and returns the
    /// future to run once the delay has elapsed. Must be called from within
    /// a tokio runtime.
    pub fn schedule<F, Fut>(&mut self, on_expire: F) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);

        let delay = self.delay;
        let expired = on_expire(self.generation);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            expired.await;
        }));

        self.generation
    }

    /// Abort the pending expiry, if any. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Claim an expiry. Returns false if `generation` has been superseded
    /// or cancelled in the meantime.
    pub fn complete(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && self.generation == generation {
            // The task is the caller itself; dropping the handle detaches it.
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
