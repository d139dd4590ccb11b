//! Recording session management
//!
//! This module provides the `RecordingController` that manages:
//! - Microphone permission and exclusive capture ownership
//! - Duration and level polling while recording
//! - Stop-and-save, cancel and teardown with guaranteed release
//! - A live level indicator, synthetic when the platform has no metering

mod config;
mod controller;
mod lease;
pub mod level;
mod status;

pub use config::RecordingConfig;
pub use controller::RecordingController;
pub use level::{LevelMeter, LevelReading};
pub use status::{CapturedAudio, RecordingError, RecordingState, RecordingStatus, StartOutcome};
