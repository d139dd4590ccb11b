//! HTTP API for driving the app core from a client
//!
//! - GET /health - Health check
//! - /notes - Note CRUD, content blocks, search and stats
//! - /chat - Conversation, composing indicator, reset
//! - /recording - Start, stop (optionally into a note), cancel, status

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
