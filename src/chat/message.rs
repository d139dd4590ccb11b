use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Agent,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message text (never empty)
    pub text: String,

    pub author: Author,

    /// Creation time; non-decreasing within a conversation
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }

    pub fn is_agent(&self) -> bool {
        self.author == Author::Agent
    }
}
