use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::RecordingConfig;
use super::lease::CaptureLease;
use super::level::LevelMeter;
use super::status::{CapturedAudio, RecordingError, RecordingState, RecordingStatus, StartOutcome};
use crate::audio::{CaptureBackend, CaptureHandle, CaptureOptions, Permission};

/// The duration and level polling tasks of an active session
struct Pollers {
    duration: JoinHandle<()>,
    level: JoinHandle<()>,
}

impl Drop for Pollers {
    fn drop(&mut self) {
        self.duration.abort();
        self.level.abort();
    }
}

struct Inner {
    state: RecordingState,
    /// Bumped on every start and cancel so a resumed start can tell it was superseded
    attempt: u64,
    lease: Option<CaptureLease>,
    pollers: Option<Pollers>,
}

/// Drives a single microphone capture from permission request to a saved
/// recording, releasing the capture on every exit path.
///
/// Only one capture can be open at a time: `start()` is rejected while a
/// session is requesting permission, active or stopping.
pub struct RecordingController {
    backend: Arc<dyn CaptureBackend>,
    config: RecordingConfig,
    inner: Mutex<Inner>,
    status: Arc<watch::Sender<RecordingStatus>>,
}

impl RecordingController {
    pub fn new(backend: Arc<dyn CaptureBackend>, config: RecordingConfig) -> Self {
        let (status, _) = watch::channel(RecordingStatus::default());
        Self {
            backend,
            config,
            inner: Mutex::new(Inner {
                state: RecordingState::Idle,
                attempt: 0,
                lease: None,
                pollers: None,
            }),
            status: Arc::new(status),
        }
    }

    pub fn state(&self) -> RecordingState {
        self.status.borrow().state
    }

    /// Current snapshot (state, elapsed time, level indicator, last error)
    pub fn status(&self) -> RecordingStatus {
        self.status.borrow().clone()
    }

    /// Follow status updates as they happen
    pub fn watch(&self) -> watch::Receiver<RecordingStatus> {
        self.status.subscribe()
    }

    /// Request the microphone and begin capturing.
    pub async fn start(&self) -> Result<StartOutcome, RecordingError> {
        let attempt = {
            let mut inner = self.inner.lock().await;
            if !inner.state.can_start() {
                warn!(state = %inner.state, "start rejected, recording already in progress");
                return Err(RecordingError::Busy(inner.state));
            }

            inner.attempt += 1;
            self.status.send_modify(|status| {
                *status = RecordingStatus {
                    capture: status.capture.clone(),
                    ..RecordingStatus::default()
                };
            });
            self.transition(&mut inner, RecordingState::RequestingPermission);
            inner.attempt
        };

        info!(backend = self.backend.name(), attempt, "requesting microphone permission");
        let permission = self.backend.request_permission().await;

        {
            let mut inner = self.inner.lock().await;
            if Self::superseded(&inner, attempt) {
                info!(attempt, "start cancelled while waiting for permission");
                return Ok(StartOutcome::Cancelled);
            }

            match permission {
                Ok(Permission::Granted) => {}
                Ok(Permission::Denied) => {
                    return Err(self.fail(&mut inner, RecordingError::PermissionDenied));
                }
                Err(e) => {
                    let err = RecordingError::Capture(format!("{:#}", e));
                    return Err(self.fail(&mut inner, err));
                }
            }
        }

        let opened = self.backend.start_capture(CaptureOptions::default()).await;

        let mut inner = self.inner.lock().await;
        let handle = match opened {
            Ok(handle) => handle,
            Err(e) if Self::superseded(&inner, attempt) => {
                debug!(attempt, "capture failed to open after cancellation: {:#}", e);
                return Ok(StartOutcome::Cancelled);
            }
            Err(e) => {
                let err = RecordingError::Capture(format!("{:#}", e));
                return Err(self.fail(&mut inner, err));
            }
        };

        let lease = CaptureLease::new(Arc::clone(&self.backend), handle.clone());
        if Self::superseded(&inner, attempt) {
            drop(inner);
            info!(%handle, "start cancelled while opening capture, releasing it");
            if let Err(e) = lease.release().await {
                debug!(%handle, "release after cancelled start failed: {:#}", e);
            }
            return Ok(StartOutcome::Cancelled);
        }

        inner.pollers = Some(self.spawn_pollers(handle.clone()));
        inner.lease = Some(lease);
        self.transition(&mut inner, RecordingState::Active);
        info!(%handle, "recording started");

        Ok(StartOutcome::Recording)
    }

    /// Finish the capture and hand back the saved recording.
    pub async fn stop_and_save(&self) -> Result<CapturedAudio, RecordingError> {
        let lease = {
            let mut inner = self.inner.lock().await;
            if inner.state != RecordingState::Active {
                return Err(RecordingError::InvalidState {
                    operation: "stop",
                    state: inner.state,
                });
            }

            self.transition(&mut inner, RecordingState::Stopping);
            inner.pollers = None;
            match inner.lease.take() {
                Some(lease) => lease,
                None => {
                    let err = RecordingError::Finalize("capture is no longer open".to_string());
                    return Err(self.fail(&mut inner, err));
                }
            }
        };

        let handle = lease.handle().clone();
        let finalized = self.backend.finalize(&handle).await;
        if let Err(e) = lease.release().await {
            warn!(%handle, "Failed to release capture after finalize: {:#}", e);
        }

        let mut inner = self.inner.lock().await;
        match finalized {
            Ok(finalized) => {
                let captured = CapturedAudio {
                    local_handle: finalized.uri,
                    duration_ms: finalized.duration_ms,
                };
                self.status.send_modify(|status| {
                    status.elapsed_ms = captured.duration_ms;
                    status.capture = Some(captured.clone());
                });
                self.transition(&mut inner, RecordingState::Completed);
                info!(
                    uri = %captured.local_handle,
                    duration_ms = captured.duration_ms,
                    "recording saved"
                );
                Ok(captured)
            }
            Err(e) => {
                let err = RecordingError::Finalize(format!("{:#}", e));
                Err(self.fail(&mut inner, err))
            }
        }
    }

    /// Abandon the session and discard anything captured.
    ///
    /// Always succeeds; calling it outside `RequestingPermission`/`Active`
    /// does nothing.
    pub async fn cancel(&self) {
        let lease = {
            let mut inner = self.inner.lock().await;
            if !inner.state.can_cancel() {
                debug!(state = %inner.state, "cancel ignored");
                return;
            }

            inner.attempt += 1;
            inner.pollers = None;
            self.transition(&mut inner, RecordingState::Cancelled);
            inner.lease.take()
        };

        if let Some(lease) = lease {
            let handle = lease.handle().clone();
            if let Err(e) = lease.release().await {
                debug!(%handle, "release during cancel failed, ignoring: {:#}", e);
            }
        }
    }

    /// Host is going away; behaves exactly like `cancel()`.
    pub async fn teardown(&self) {
        self.cancel().await;
    }

    fn superseded(inner: &Inner, attempt: u64) -> bool {
        inner.attempt != attempt || inner.state != RecordingState::RequestingPermission
    }

    fn transition(&self, inner: &mut Inner, to: RecordingState) {
        let from = inner.state;
        inner.state = to;
        self.status.send_modify(|status| status.state = to);
        info!(%from, %to, "recording state transition");
    }

    fn fail(&self, inner: &mut Inner, err: RecordingError) -> RecordingError {
        error!(error = %err, "recording failed");
        inner.pollers = None;
        let message = err.to_string();
        self.status
            .send_modify(|status| status.error = Some(message.clone()));
        self.transition(inner, RecordingState::Failed);
        err
    }

    fn spawn_pollers(&self, handle: CaptureHandle) -> Pollers {
        let duration = tokio::spawn(poll_duration(
            Arc::clone(&self.backend),
            handle.clone(),
            Arc::clone(&self.status),
            self.config.duration_poll_interval,
        ));
        let level = tokio::spawn(poll_level(
            Arc::clone(&self.backend),
            handle,
            Arc::clone(&self.status),
            LevelMeter::new(
                self.config.metering_probe_samples,
                self.config.oscillation_period,
            ),
            self.config.level_poll_interval,
        ));

        Pollers { duration, level }
    }
}

fn ticker(every: Duration) -> tokio::time::Interval {
    let every = every.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Apply a poll result unless the session has left `Active`.
///
/// An aborted poll task may still be running its last iteration on another
/// worker, so every write is checked under the watch lock.
fn update_if_active(
    status: &watch::Sender<RecordingStatus>,
    update: impl FnOnce(&mut RecordingStatus),
) -> bool {
    status.send_if_modified(|s| {
        if s.state != RecordingState::Active {
            return false;
        }
        update(s);
        true
    })
}

async fn poll_duration(
    backend: Arc<dyn CaptureBackend>,
    handle: CaptureHandle,
    status: Arc<watch::Sender<RecordingStatus>>,
    every: Duration,
) {
    let mut ticker = ticker(every);
    loop {
        ticker.tick().await;
        match backend.read_status(&handle).await {
            Ok(capture) => {
                update_if_active(&status, |s| s.elapsed_ms = capture.elapsed_ms);
            }
            Err(e) => debug!(%handle, "duration poll failed: {:#}", e),
        }
    }
}

async fn poll_level(
    backend: Arc<dyn CaptureBackend>,
    handle: CaptureHandle,
    status: Arc<watch::Sender<RecordingStatus>>,
    mut meter: LevelMeter,
    every: Duration,
) {
    let started = Instant::now();
    let mut ticker = ticker(every);
    loop {
        ticker.tick().await;

        let reading = if meter.needs_reading() {
            match backend.read_status(&handle).await {
                Ok(capture) => capture.metering_db,
                Err(e) => {
                    // Not a sample: only successful reads decide metering
                    debug!(%handle, "level poll failed: {:#}", e);
                    continue;
                }
            }
        } else {
            None
        };

        let was_undecided = meter.is_available().is_none();
        let Some(update) = meter.observe(reading, started.elapsed()) else {
            continue;
        };

        let available = meter.is_available();
        if was_undecided && available == Some(false) {
            info!(%handle, "no metering reported, using synthetic level indicator");
        }
        update_if_active(&status, |s| {
            s.metering_available = available;
            s.level = update.level;
            s.scale = update.scale;
        });
    }
}
