use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Notes
        .route(
            "/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route("/notes/stats", get(handlers::note_stats))
        .route(
            "/notes/:id",
            get(handlers::get_note)
                .patch(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .route("/notes/:id/blocks", post(handlers::append_block))
        .route(
            "/notes/:id/blocks/:index",
            put(handlers::replace_block).delete(handlers::remove_block),
        )
        // Chat
        .route(
            "/chat/messages",
            get(handlers::get_chat).post(handlers::send_message),
        )
        .route("/chat/composing", put(handlers::set_composing))
        .route("/chat/reset", post(handlers::reset_chat))
        // Recording control
        .route("/recording/status", get(handlers::recording_status))
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/recording/cancel", post(handlers::cancel_recording))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
