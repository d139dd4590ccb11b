use std::time::Duration;

/// Polling and metering settings for a recording controller
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// How often elapsed duration is read from the capture
    pub duration_poll_interval: Duration,

    /// How often loudness is read for the level indicator
    pub level_poll_interval: Duration,

    /// Level polls without any metering value before metering is
    /// declared unavailable for the session
    pub metering_probe_samples: u32,

    /// Period of the synthetic indicator pulse used without metering
    pub oscillation_period: Duration,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            duration_poll_interval: Duration::from_millis(200),
            level_poll_interval: Duration::from_millis(140),
            metering_probe_samples: 2,
            oscillation_period: Duration::from_millis(1300),
        }
    }
}
