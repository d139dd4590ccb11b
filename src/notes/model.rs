use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recording::CapturedAudio;

/// One piece of note content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        value: String,
    },
    Image {
        url: String,
    },
    Audio {
        url: String,
        /// Display duration, `mm:ss`
        duration: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
        #[serde(default)]
        uploading: bool,
    },
}

impl ContentBlock {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::Image { url: url.into() }
    }

    /// Audio block for a finished recording
    pub fn from_capture(capture: &CapturedAudio) -> Self {
        Self::Audio {
            url: capture.local_handle.clone(),
            duration: format_duration(capture.duration_ms),
            transcript: None,
            uploading: false,
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Text { .. } => BlockKind::Text,
            Self::Image { .. } => BlockKind::Image,
            Self::Audio { .. } => BlockKind::Audio,
        }
    }

    /// Case-insensitive match against text blocks; other blocks never match
    pub fn matches_text(&self, lowercase_query: &str) -> bool {
        match self {
            Self::Text { value } => value.to_lowercase().contains(lowercase_query),
            Self::Image { .. } | Self::Audio { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    Image,
    Audio,
}

/// Format milliseconds as `mm:ss` (whole seconds, rounded down)
pub fn format_duration(duration_ms: u64) -> String {
    let secs = duration_ms / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub updated_at: DateTime<Utc>,
    pub content: Vec<ContentBlock>,
}

/// Totals across a repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteStats {
    pub total_notes: usize,
    pub total_text_blocks: usize,
    pub total_image_blocks: usize,
    pub total_audio_blocks: usize,
}

impl NoteStats {
    pub fn record(&mut self, note: &Note) {
        self.total_notes += 1;
        for block in &note.content {
            match block.kind() {
                BlockKind::Text => self.total_text_blocks += 1,
                BlockKind::Image => self.total_image_blocks += 1,
                BlockKind::Audio => self.total_audio_blocks += 1,
            }
        }
    }
}
