use serde::{Deserialize, Serialize};

/// Lifecycle of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    #[default]
    Idle,
    RequestingPermission,
    Active,
    Stopping,
    Cancelled,
    Completed,
    Failed,
}

impl RecordingState {
    /// A new session may be started from here
    pub fn can_start(self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Cancelled | Self::Completed | Self::Failed
        )
    }

    /// `cancel()` has an effect from here
    pub fn can_cancel(self) -> bool {
        matches!(self, Self::RequestingPermission | Self::Active)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RecordingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::RequestingPermission => write!(f, "REQUESTING_PERMISSION"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Stopping => write!(f, "STOPPING"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// A finished recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedAudio {
    /// Where the platform stored the audio
    pub local_handle: String,
    pub duration_ms: u64,
}

/// Observable snapshot of the controller, suitable for driving a UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingStatus {
    pub state: RecordingState,

    /// Milliseconds captured so far in the current session
    pub elapsed_ms: u64,

    /// `None` until decided during the first level polls
    pub metering_available: Option<bool>,

    /// Normalized loudness (0.0 to 1.0); stays 0.0 without metering
    pub level: f32,

    /// Indicator scale factor (1.0 to 1.5)
    pub scale: f32,

    /// User-facing message for the last terminal failure
    pub error: Option<String>,

    /// Output of the last completed session
    pub capture: Option<CapturedAudio>,
}

impl Default for RecordingStatus {
    fn default() -> Self {
        Self {
            state: RecordingState::Idle,
            elapsed_ms: 0,
            metering_available: None,
            level: 0.0,
            scale: 1.0,
            error: None,
            capture: None,
        }
    }
}

/// How a `start()` call ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// Capture is running
    Recording,
    /// `cancel()` arrived while the start was still in flight
    Cancelled,
}

/// Errors surfaced by the recording controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordingError {
    #[error("Microphone permission denied. Please allow microphone access to record audio.")]
    PermissionDenied,

    #[error("a recording is already in progress ({0})")]
    Busy(RecordingState),

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: RecordingState,
    },

    #[error("Unable to start recording: {0}")]
    Capture(String),

    #[error("Unable to save recording: {0}")]
    Finalize(String),
}
