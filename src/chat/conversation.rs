use chrono::{DateTime, Utc};

use super::message::{Author, Message};

/// Append-only, ordered list of chat messages
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation that opens with an agent greeting
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.append(Author::Agent, greeting.into());
        conversation
    }

    /// Append a message and return a copy of it.
    ///
    /// Timestamps never go backwards: if the clock reads earlier than the
    /// previous message, the previous timestamp is reused.
    pub fn append(&mut self, author: Author, text: String) -> Message {
        let message = Message {
            text,
            author,
            timestamp: self.next_timestamp(Utc::now()),
        };
        self.messages.push(message.clone());
        message
    }

    fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.messages.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The current turn: every user message after the most recent agent
    /// message (or from the start when the agent has not spoken yet).
    pub fn current_turn(&self) -> &[Message] {
        let start = self
            .messages
            .iter()
            .rposition(Message::is_agent)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        &self.messages[start..]
    }

    /// True when the last message came from the user
    pub fn awaiting_reply(&self) -> bool {
        self.last().map(Message::is_user).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn test_turn_without_agent_message_starts_at_beginning() {
        let mut conversation = Conversation::new();
        conversation.append(Author::User, "a".into());
        conversation.append(Author::User, "b".into());

        assert_eq!(texts(conversation.current_turn()), vec!["a", "b"]);
        assert!(conversation.awaiting_reply());
    }

    #[test]
    fn test_turn_excludes_previous_turns() {
        let mut conversation = Conversation::with_greeting("hi");
        conversation.append(Author::User, "a".into());
        conversation.append(Author::Agent, "reply".into());
        conversation.append(Author::User, "b".into());
        conversation.append(Author::User, "c".into());

        assert_eq!(texts(conversation.current_turn()), vec!["b", "c"]);
    }

    #[test]
    fn test_turn_is_empty_after_agent_reply() {
        let mut conversation = Conversation::new();
        conversation.append(Author::User, "a".into());
        conversation.append(Author::Agent, "reply".into());

        assert!(conversation.current_turn().is_empty());
        assert!(!conversation.awaiting_reply());
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let mut conversation = Conversation::new();
        let first = conversation.append(Author::User, "a".into());
        let earlier = first.timestamp - chrono::Duration::seconds(5);

        assert_eq!(conversation.next_timestamp(earlier), first.timestamp);
    }
}
