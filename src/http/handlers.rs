use super::state::AppState;
use crate::chat::{Message, ResponderState};
use crate::notes::{ContentBlock, Note, NoteError, NotePatch, NoteStats};
use crate::recording::{CapturedAudio, RecordingError, RecordingStatus, StartOutcome};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error rendered as `{ "error": ... }` with a status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<NoteError> for ApiError {
    fn from(err: NoteError) -> Self {
        let status = match err {
            NoteError::NotFound(_) => StatusCode::NOT_FOUND,
            NoteError::InvalidBlockIndex { .. } => StatusCode::BAD_REQUEST,
            NoteError::DuplicateId(_) => StatusCode::CONFLICT,
        };
        Self::new(status, err.to_string())
    }
}

impl From<RecordingError> for ApiError {
    fn from(err: RecordingError) -> Self {
        let status = match err {
            RecordingError::PermissionDenied => StatusCode::FORBIDDEN,
            RecordingError::Busy(_) | RecordingError::InvalidState { .. } => StatusCode::CONFLICT,
            RecordingError::Capture(_) | RecordingError::Finalize(_) => {
                error!("Recording error: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Optional text to search for
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateNoteRequest {
    pub content: Option<Vec<ContentBlock>>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ComposingRequest {
    pub composing: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub state: ResponderState,
    pub composing: bool,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub outcome: StartOutcome,
    pub status: RecordingStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct StopRecordingRequest {
    /// Attach the recording to this note as an audio block
    pub note_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub capture: CapturedAudio,
    pub note: Option<Note>,
}

// ============================================================================
// Notes
// ============================================================================

/// GET /notes?q=
pub async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Note>>> {
    let notes = match query.q {
        Some(q) => state.notes.search(&q).await?,
        None => state.notes.list().await?,
    };
    Ok(Json(notes))
}

/// POST /notes
pub async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let note = state.notes.create(req.content).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /notes/:id
pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Note>> {
    match state.notes.get(&id).await? {
        Some(note) => Ok(Json(note)),
        None => Err(NoteError::NotFound(id).into()),
    }
}

/// PATCH /notes/:id
pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<NotePatch>,
) -> ApiResult<Json<Note>> {
    Ok(Json(state.notes.update(&id, patch).await?))
}

/// DELETE /notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.notes.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /notes/:id/blocks
pub async fn append_block(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(block): Json<ContentBlock>,
) -> ApiResult<Json<Note>> {
    Ok(Json(state.notes.append_block(&id, block).await?))
}

/// PUT /notes/:id/blocks/:index
pub async fn replace_block(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Json(block): Json<ContentBlock>,
) -> ApiResult<Json<Note>> {
    Ok(Json(state.notes.replace_block_at(&id, index, block).await?))
}

/// DELETE /notes/:id/blocks/:index
pub async fn remove_block(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
) -> ApiResult<Json<Note>> {
    Ok(Json(state.notes.remove_block_at(&id, index).await?))
}

/// GET /notes/stats
pub async fn note_stats(State(state): State<AppState>) -> ApiResult<Json<NoteStats>> {
    Ok(Json(state.notes.stats().await?))
}

// ============================================================================
// Chat
// ============================================================================

async fn chat_snapshot(state: &AppState) -> ChatResponse {
    ChatResponse {
        state: state.chat.state().await,
        composing: state.chat.is_composing().await,
        messages: state.chat.messages().await,
    }
}

/// GET /chat/messages
pub async fn get_chat(State(state): State<AppState>) -> Json<ChatResponse> {
    Json(chat_snapshot(&state).await)
}

/// POST /chat/messages
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    match state.chat.submit_user_message(&req.text).await {
        Some(message) => Ok((StatusCode::ACCEPTED, Json(message))),
        None => Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Message text must not be empty",
        )),
    }
}

/// PUT /chat/composing
pub async fn set_composing(
    State(state): State<AppState>,
    Json(req): Json<ComposingRequest>,
) -> Json<ChatResponse> {
    state.chat.set_composing(req.composing).await;
    Json(chat_snapshot(&state).await)
}

/// POST /chat/reset
pub async fn reset_chat(State(state): State<AppState>) -> Json<ChatResponse> {
    state.chat.reset().await;
    Json(chat_snapshot(&state).await)
}

// ============================================================================
// Recording
// ============================================================================

/// GET /recording/status
pub async fn recording_status(State(state): State<AppState>) -> Json<RecordingStatus> {
    Json(state.recorder.status())
}

/// POST /recording/start
pub async fn start_recording(
    State(state): State<AppState>,
) -> ApiResult<Json<StartRecordingResponse>> {
    let outcome = state.recorder.start().await?;
    info!(?outcome, "recording start requested over HTTP");
    Ok(Json(StartRecordingResponse {
        outcome,
        status: state.recorder.status(),
    }))
}

/// POST /recording/stop
/// Stop the active recording, optionally attaching it to a note
pub async fn stop_recording(
    State(state): State<AppState>,
    req: Option<Json<StopRecordingRequest>>,
) -> ApiResult<Json<StopRecordingResponse>> {
    let note_id = req.and_then(|Json(req)| req.note_id);

    // Check the target before stopping so a bad id does not end the recording
    if let Some(id) = &note_id {
        if state.notes.get(id).await?.is_none() {
            return Err(NoteError::NotFound(id.clone()).into());
        }
    }

    let capture = state.recorder.stop_and_save().await?;
    let note = match note_id {
        Some(id) => Some(
            state
                .notes
                .append_block(&id, ContentBlock::from_capture(&capture))
                .await?,
        ),
        None => None,
    };

    Ok(Json(StopRecordingResponse { capture, note }))
}

/// POST /recording/cancel
pub async fn cancel_recording(State(state): State<AppState>) -> Json<RecordingStatus> {
    state.recorder.cancel().await;
    Json(state.recorder.status())
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
