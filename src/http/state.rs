use crate::chat::TurnResponder;
use crate::notes::NoteRepository;
use crate::recording::RecordingController;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Note storage
    pub notes: Arc<dyn NoteRepository>,

    /// The chat conversation and its reply scheduler
    pub chat: Arc<TurnResponder>,

    /// The single microphone recording controller
    pub recorder: Arc<RecordingController>,
}

impl AppState {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        chat: Arc<TurnResponder>,
        recorder: Arc<RecordingController>,
    ) -> Self {
        Self {
            notes,
            chat,
            recorder,
        }
    }
}
