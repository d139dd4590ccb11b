pub mod backend;
pub mod simulated;
pub mod wav;

pub use backend::{
    CaptureBackend, CaptureHandle, CaptureOptions, CaptureStatus, FinalizedCapture, Permission,
};
pub use simulated::{SimulatedMicrophone, SimulatedMicrophoneConfig};
pub use wav::{WavFileWriter, WavSummary};
