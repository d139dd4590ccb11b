pub mod audio;
pub mod chat;
pub mod config;
pub mod http;
pub mod notes;
pub mod recording;

pub use audio::{CaptureBackend, SimulatedMicrophone, SimulatedMicrophoneConfig};
pub use chat::{EchoGenerator, Message, ResponderConfig, ResponseGenerator, TurnResponder};
pub use config::Config;
pub use http::{create_router, AppState};
pub use notes::{ContentBlock, InMemoryNoteRepository, Note, NoteRepository};
pub use recording::{
    CapturedAudio, RecordingConfig, RecordingController, RecordingError, RecordingState,
    RecordingStatus, StartOutcome,
};
