//! Turn-coalescing chat responder
//!
//! Consecutive user messages form a turn. Once the user has been quiet (and
//! is not composing) for the configured delay, one agent reply is generated
//! for the whole turn. Any new activity restarts the countdown.

mod conversation;
mod message;
mod responder;
mod timer;

pub use conversation::Conversation;
pub use message::{Author, Message};
pub use responder::{
    EchoGenerator, ResponderConfig, ResponderState, ResponseGenerator, TurnResponder,
};
pub use timer::DebounceTimer;
