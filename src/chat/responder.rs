use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::conversation::Conversation;
use super::message::{Author, Message};
use super::timer::DebounceTimer;

const MESSAGE_SEPARATOR: &str = "; ";

/// Produces the agent reply for one turn of user messages.
///
/// Errors are never propagated to callers of the responder; a fallback
/// reply is appended instead.
pub trait ResponseGenerator: Send + Sync {
    fn generate(&self, turn: &[Message]) -> Result<String>;
}

impl<F> ResponseGenerator for F
where
    F: Fn(&[Message]) -> Result<String> + Send + Sync,
{
    fn generate(&self, turn: &[Message]) -> Result<String> {
        self(turn)
    }
}

/// Acknowledges the whole turn in a single reply
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGenerator;

impl ResponseGenerator for EchoGenerator {
    fn generate(&self, turn: &[Message]) -> Result<String> {
        let joined = turn
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join(MESSAGE_SEPARATOR);
        Ok(format!("I received: \"{}\"", joined))
    }
}

/// Configuration for a turn responder
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Quiet period required before replying
    pub reply_delay: Duration,
    /// Agent message the conversation opens with
    pub greeting: Option<String>,
    /// Reply used when the generator fails
    pub fallback_reply: String,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(3000),
            greeting: Some("How are you doing lately?".to_string()),
            fallback_reply: "Sorry, I encountered an error. Please try again.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderState {
    /// No reply scheduled
    Waiting,
    /// Reply timer running
    Armed,
}

struct Inner {
    conversation: Conversation,
    composing: bool,
    timer: DebounceTimer,
}

struct Shared {
    state: Mutex<Inner>,
    generator: Arc<dyn ResponseGenerator>,
    fallback_reply: String,
    events: broadcast::Sender<Message>,
    /// Set when the responder is dropped; pending expiries append nothing
    closed: AtomicBool,
}

/// Batches consecutive user messages into a turn and replies once per turn,
/// after the user has been quiet for `reply_delay`.
pub struct TurnResponder {
    shared: Arc<Shared>,
}

impl TurnResponder {
    pub fn new(config: ResponderConfig, generator: Arc<dyn ResponseGenerator>) -> Self {
        let conversation = match config.greeting {
            Some(greeting) => Conversation::with_greeting(greeting),
            None => Conversation::new(),
        };
        let (events, _) = broadcast::channel(64);

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Inner {
                    conversation,
                    composing: false,
                    timer: DebounceTimer::new(config.reply_delay),
                }),
                generator,
                fallback_reply: config.fallback_reply,
                events,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Append a user message. Whitespace-only input is ignored and returns `None`.
    ///
    /// Sending commits the input field, so the composing indicator is cleared.
    pub async fn submit_user_message(&self, text: &str) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring empty user message");
            return None;
        }

        let mut inner = self.shared.state.lock().await;
        let message = inner.conversation.append(Author::User, text.to_string());
        inner.composing = false;
        let _ = self.shared.events.send(message.clone());

        self.reevaluate(&mut inner);
        Some(message)
    }

    /// Record whether the input field holds uncommitted text
    pub async fn set_composing(&self, composing: bool) {
        let mut inner = self.shared.state.lock().await;
        if inner.composing == composing {
            return;
        }

        debug!(composing, "composing indicator changed");
        inner.composing = composing;
        self.reevaluate(&mut inner);
    }

    /// Cancel any pending reply and clear transient input state.
    /// Messages already appended are kept.
    pub async fn reset(&self) {
        let mut inner = self.shared.state.lock().await;
        if inner.timer.cancel() {
            info!("pending reply cancelled by reset");
        }
        inner.composing = false;
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.shared.state.lock().await.conversation.messages().to_vec()
    }

    pub async fn state(&self) -> ResponderState {
        if self.shared.state.lock().await.timer.is_pending() {
            ResponderState::Armed
        } else {
            ResponderState::Waiting
        }
    }

    pub async fn is_composing(&self) -> bool {
        self.shared.state.lock().await.composing
    }

    /// Receive every message appended from now on (user and agent)
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.shared.events.subscribe()
    }

    /// Drop the pending reply and arm a fresh one if the user is waiting
    /// for an answer and not typing.
    fn reevaluate(&self, inner: &mut Inner) {
        inner.timer.cancel();

        if inner.conversation.awaiting_reply() && !inner.composing {
            let shared = Arc::clone(&self.shared);
            let generation = inner
                .timer
                .schedule(move |generation| reply_when_quiet(shared, generation));
            debug!(
                generation,
                delay_ms = inner.timer.delay().as_millis() as u64,
                "reply timer armed"
            );
        }
    }
}

impl Drop for TurnResponder {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        if let Ok(mut inner) = self.shared.state.try_lock() {
            inner.timer.cancel();
        }
    }
}

async fn reply_when_quiet(shared: Arc<Shared>, generation: u64) {
    let mut inner = shared.state.lock().await;
    if shared.closed.load(Ordering::Acquire) {
        debug!(generation, "responder dropped, reply discarded");
        return;
    }
    if !inner.timer.complete(generation) {
        debug!(generation, "stale reply timer ignored");
        return;
    }

    let turn = inner.conversation.current_turn();
    if turn.is_empty() {
        return;
    }

    let turn_len = turn.len();
    let reply = match shared.generator.generate(turn) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!(turn_len, "response generator returned an empty reply");
            shared.fallback_reply.clone()
        }
        Err(e) => {
            warn!(turn_len, error = %e, "response generator failed");
            shared.fallback_reply.clone()
        }
    };

    let message = inner.conversation.append(Author::Agent, reply);
    info!(turn_len, "agent replied to turn");
    let _ = shared.events.send(message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expiry_after_close_appends_nothing() {
        let responder = TurnResponder::new(ResponderConfig::default(), Arc::new(EchoGenerator));
        responder.submit_user_message("still there?").await;
        let shared = Arc::clone(&responder.shared);

        // Simulate an expiry that woke up just as the responder went away
        shared.closed.store(true, Ordering::Release);
        reply_when_quiet(Arc::clone(&shared), 1).await;

        let inner = shared.state.lock().await;
        assert_eq!(inner.conversation.len(), 2);
        assert!(inner.conversation.awaiting_reply());
    }
}
