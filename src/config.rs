use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::chat::ResponderConfig;
use crate::recording::RecordingConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub chat: ChatConfig,
    pub recording: RecordingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Quiet period after the last user message before a reply is generated
    pub reply_delay_ms: u64,
    /// Agent greeting seeded into a fresh conversation (empty = none)
    pub greeting: String,
    /// Reply appended when the generator fails
    pub fallback_reply: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingSettings {
    pub recordings_path: String,
    pub sample_rate: u32,
    pub duration_poll_ms: u64,
    pub level_poll_ms: u64,
    pub metering_probe_samples: u32,
    pub oscillation_period_ms: u64,
}

impl Config {
    /// Load configuration from an optional file, `SHIRO__*` environment
    /// variables and built-in defaults (in increasing order of precedence:
    /// defaults, file, environment).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "shiro-notes")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8787)?
            .set_default("chat.reply_delay_ms", 3000)?
            .set_default("chat.greeting", "How are you doing lately?")?
            .set_default(
                "chat.fallback_reply",
                "Sorry, I encountered an error. Please try again.",
            )?
            .set_default("recording.recordings_path", "recordings")?
            .set_default("recording.sample_rate", 16000)?
            .set_default("recording.duration_poll_ms", 200)?
            .set_default("recording.level_poll_ms", 140)?
            .set_default("recording.metering_probe_samples", 2)?
            .set_default("recording.oscillation_period_ms", 1300)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SHIRO").separator("__"))
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn responder_config(&self) -> ResponderConfig {
        let greeting = self.chat.greeting.trim();
        ResponderConfig {
            reply_delay: Duration::from_millis(self.chat.reply_delay_ms),
            greeting: (!greeting.is_empty()).then(|| greeting.to_string()),
            fallback_reply: self.chat.fallback_reply.clone(),
        }
    }

    pub fn recording_config(&self) -> RecordingConfig {
        RecordingConfig {
            duration_poll_interval: Duration::from_millis(self.recording.duration_poll_ms),
            level_poll_interval: Duration::from_millis(self.recording.level_poll_ms),
            metering_probe_samples: self.recording.metering_probe_samples,
            oscillation_period: Duration::from_millis(self.recording.oscillation_period_ms),
        }
    }

    pub fn recordings_dir(&self) -> PathBuf {
        PathBuf::from(&self.recording.recordings_path)
    }
}
