// Integration tests for the turn-coalescing chat responder
//
// Time is paused so the reply delay can be stepped through exactly.

use anyhow::{anyhow, Result};
use shiro_notes::chat::{
    Author, EchoGenerator, Message, ResponderConfig, ResponderState, ResponseGenerator,
    TurnResponder,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

const GREETING: &str = "How are you doing lately?";

fn responder_with(generator: Arc<dyn ResponseGenerator>) -> TurnResponder {
    TurnResponder::new(ResponderConfig::default(), generator)
}

/// Generator that remembers every turn it was asked about
#[derive(Default)]
struct RecordingGenerator {
    turns: Mutex<Vec<Vec<String>>>,
}

impl ResponseGenerator for RecordingGenerator {
    fn generate(&self, turn: &[Message]) -> Result<String> {
        let texts: Vec<String> = turn.iter().map(|m| m.text.clone()).collect();
        self.turns.lock().unwrap().push(texts);
        Ok("noted".to_string())
    }
}

fn agent_messages(messages: &[Message]) -> Vec<&Message> {
    messages.iter().filter(|m| m.is_agent()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_conversation_opens_with_greeting() -> Result<()> {
    let responder = responder_with(Arc::new(EchoGenerator));

    let messages = responder.messages().await;

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].author, Author::Agent);
    assert_eq!(messages[0].text, GREETING);
    assert_eq!(responder.state().await, ResponderState::Waiting);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_messages_within_delay_form_one_turn() -> Result<()> {
    let generator = Arc::new(RecordingGenerator::default());
    let responder = responder_with(generator.clone());

    responder.submit_user_message("a").await;
    sleep(Duration::from_millis(1000)).await;
    responder.submit_user_message("b").await;
    sleep(Duration::from_millis(1000)).await;
    responder.submit_user_message("c").await;

    sleep(Duration::from_millis(2900)).await;
    assert_eq!(responder.messages().await.len(), 4);
    assert_eq!(responder.state().await, ResponderState::Armed);

    sleep(Duration::from_millis(200)).await;
    let messages = responder.messages().await;
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[4].author, Author::Agent);
    assert_eq!(responder.state().await, ResponderState::Waiting);

    let turns = generator.turns.lock().unwrap().clone();
    assert_eq!(turns, vec![vec!["a", "b", "c"]]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_echo_reply_joins_turn() -> Result<()> {
    let responder = responder_with(Arc::new(EchoGenerator));

    responder.submit_user_message("hello").await;
    responder.submit_user_message("  how are you  ").await;
    sleep(Duration::from_millis(3100)).await;

    let messages = responder.messages().await;
    assert_eq!(messages[2].text, "how are you");
    assert_eq!(
        messages.last().map(|m| m.text.as_str()),
        Some("I received: \"hello; how are you\"")
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_each_turn_gets_exactly_one_reply() -> Result<()> {
    let generator = Arc::new(RecordingGenerator::default());
    let responder = responder_with(generator.clone());

    responder.submit_user_message("first").await;
    sleep(Duration::from_secs(10)).await;
    responder.submit_user_message("second").await;
    responder.submit_user_message("third").await;
    sleep(Duration::from_secs(10)).await;

    let messages = responder.messages().await;
    assert_eq!(agent_messages(&messages).len(), 3);

    let turns = generator.turns.lock().unwrap().clone();
    assert_eq!(turns, vec![vec!["first"], vec!["second", "third"]]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_composing_holds_reply_until_released() -> Result<()> {
    let responder = responder_with(Arc::new(EchoGenerator));

    responder.submit_user_message("a").await;
    sleep(Duration::from_millis(500)).await;
    responder.set_composing(true).await;
    assert_eq!(responder.state().await, ResponderState::Waiting);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(responder.messages().await.len(), 2);

    responder.set_composing(false).await;
    assert_eq!(responder.state().await, ResponderState::Armed);

    sleep(Duration::from_millis(2900)).await;
    assert_eq!(responder.messages().await.len(), 2);

    sleep(Duration::from_millis(200)).await;
    let messages = responder.messages().await;
    assert_eq!(messages.len(), 3);
    assert!(messages[2].is_agent());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_submitting_clears_composing() -> Result<()> {
    let responder = responder_with(Arc::new(EchoGenerator));

    responder.set_composing(true).await;
    responder.submit_user_message("done typing").await;

    assert!(!responder.is_composing().await);
    assert_eq!(responder.state().await, ResponderState::Armed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_whitespace_message_is_ignored() -> Result<()> {
    let responder = responder_with(Arc::new(EchoGenerator));

    let appended = responder.submit_user_message("   ").await;

    assert!(appended.is_none());
    assert_eq!(responder.messages().await.len(), 1);
    assert_eq!(responder.state().await, ResponderState::Waiting);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(responder.messages().await.len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_generator_failure_appends_single_fallback() -> Result<()> {
    let generator: Arc<dyn ResponseGenerator> =
        Arc::new(|_turn: &[Message]| -> Result<String> { Err(anyhow!("model offline")) });
    let responder = responder_with(generator);

    responder.submit_user_message("anyone there?").await;
    sleep(Duration::from_secs(10)).await;

    let messages = responder.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(
        messages[2].text,
        "Sorry, I encountered an error. Please try again."
    );
    assert!(messages[2].is_agent());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_blank_generator_reply_uses_fallback() -> Result<()> {
    let config = ResponderConfig {
        fallback_reply: "fallback".to_string(),
        ..ResponderConfig::default()
    };
    let generator: Arc<dyn ResponseGenerator> =
        Arc::new(|_turn: &[Message]| -> Result<String> { Ok("  ".to_string()) });
    let responder = TurnResponder::new(config, generator);

    responder.submit_user_message("hi").await;
    sleep(Duration::from_secs(4)).await;

    let messages = responder.messages().await;
    assert_eq!(messages.last().map(|m| m.text.as_str()), Some("fallback"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_pending_reply_and_keeps_messages() -> Result<()> {
    let responder = responder_with(Arc::new(EchoGenerator));

    responder.submit_user_message("a").await;
    responder.set_composing(true).await;
    responder.reset().await;

    assert_eq!(responder.state().await, ResponderState::Waiting);
    assert!(!responder.is_composing().await);

    sleep(Duration::from_secs(10)).await;
    let messages = responder.messages().await;
    assert_eq!(messages.len(), 2);
    assert!(messages[1].is_user());

    // The unanswered message still belongs to the next turn
    responder.submit_user_message("b").await;
    sleep(Duration::from_millis(3100)).await;
    assert_eq!(
        responder.messages().await.last().map(|m| m.text.clone()),
        Some("I received: \"a; b\"".to_string())
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_user_and_agent_messages() -> Result<()> {
    let responder = responder_with(Arc::new(EchoGenerator));
    let mut events = responder.subscribe();

    responder.submit_user_message("ping").await;
    let user = events.recv().await?;
    assert_eq!(user.author, Author::User);
    assert_eq!(user.text, "ping");

    let agent = events.recv().await?;
    assert_eq!(agent.author, Author::Agent);
    assert_eq!(agent.text, "I received: \"ping\"");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_no_greeting_when_disabled() -> Result<()> {
    let config = ResponderConfig {
        greeting: None,
        reply_delay: Duration::from_millis(500),
        ..ResponderConfig::default()
    };
    let responder = TurnResponder::new(config, Arc::new(EchoGenerator));
    assert!(responder.messages().await.is_empty());

    responder.submit_user_message("x").await;
    sleep(Duration::from_millis(600)).await;

    let messages = responder.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, "I received: \"x\"");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_responder_cancels_pending_reply() -> Result<()> {
    let responder = responder_with(Arc::new(EchoGenerator));
    let mut events = responder.subscribe();

    responder.submit_user_message("bye").await;
    assert_eq!(events.recv().await?.text, "bye");
    drop(responder);

    sleep(Duration::from_secs(5)).await;
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Closed)
    ));
    Ok(())
}
