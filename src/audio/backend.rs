use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Outcome of a microphone permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Audio session settings requested when a capture starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Put the platform audio session in recording mode
    pub exclusive: bool,
    /// Allow other apps' audio to keep playing
    pub mix_with_others: bool,
    /// Ask the platform to report loudness while recording
    pub metering: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            exclusive: true,
            mix_with_others: false,
            metering: true,
        }
    }
}

/// Opaque reference to an open capture resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureHandle(pub String);

impl CaptureHandle {
    pub fn new_random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time status of a running capture
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CaptureStatus {
    /// Milliseconds captured so far
    pub elapsed_ms: u64,
    /// Instantaneous loudness in dBFS, if the platform meters
    pub metering_db: Option<f32>,
}

/// Result of finalizing a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedCapture {
    /// Local location of the recorded audio
    pub uri: String,
    pub duration_ms: u64,
}

/// Microphone capture capability provided by the host platform
///
/// Implementations:
/// - `SimulatedMicrophone`: synthesised tone written to a WAV file
/// - test doubles in `tests/common`
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Ask the user/platform for microphone access
    async fn request_permission(&self) -> Result<Permission>;

    /// Configure the audio session and start capturing
    async fn start_capture(&self, options: CaptureOptions) -> Result<CaptureHandle>;

    /// Read elapsed duration and (optionally) loudness
    async fn read_status(&self, handle: &CaptureHandle) -> Result<CaptureStatus>;

    /// Stop capturing and persist the recording
    async fn finalize(&self, handle: &CaptureHandle) -> Result<FinalizedCapture>;

    /// Free the resource; must be safe to call after `finalize`
    async fn release(&self, handle: &CaptureHandle) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
