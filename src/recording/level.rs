//! Loudness to indicator-scale mapping

use std::f32::consts::TAU;
use std::time::Duration;

/// Quietest level a platform meter reports
pub const METER_FLOOR_DB: f32 = -160.0;

pub const REST_SCALE: f32 = 1.0;
pub const MAX_METERED_SCALE: f32 = 1.5;
pub const MAX_SYNTHETIC_SCALE: f32 = 1.25;

/// Map dBFS (floor -160) onto 0.0..=1.0
pub fn normalize_db(db: f32) -> f32 {
    if db.is_nan() {
        return 0.0;
    }
    (db.clamp(METER_FLOOR_DB, 0.0) - METER_FLOOR_DB) / -METER_FLOOR_DB
}

/// Linear map of normalized loudness onto 1.0..=1.5
pub fn scale_for_level(level: f32) -> f32 {
    REST_SCALE + (MAX_METERED_SCALE - REST_SCALE) * level.clamp(0.0, 1.0)
}

/// Smooth pulse between 1.0 and 1.25 used when there is no real signal
pub fn synthetic_scale(elapsed: Duration, period: Duration) -> f32 {
    let period_ms = period.as_millis().max(1) as f32;
    let phase = (elapsed.as_millis() as f32 % period_ms) / period_ms;
    let amplitude = (MAX_SYNTHETIC_SCALE - REST_SCALE) / 2.0;
    REST_SCALE + amplitude * (1.0 - (TAU * phase).cos())
}

/// One update for the level indicator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelReading {
    pub level: f32,
    pub scale: f32,
}

/// Tracks whether a session has real metering and produces indicator values.
///
/// Metering is considered available as soon as one reading carries a dB
/// value. After `probe_samples` polls with none, it is declared unavailable
/// for the rest of the session and the synthetic pulse takes over.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    probe_samples: u32,
    polls_without_metering: u32,
    available: Option<bool>,
    period: Duration,
}

impl LevelMeter {
    pub fn new(probe_samples: u32, period: Duration) -> Self {
        Self {
            probe_samples: probe_samples.max(1),
            polls_without_metering: 0,
            available: None,
            period,
        }
    }

    pub fn is_available(&self) -> Option<bool> {
        self.available
    }

    /// False once metering has been ruled out; no more reads are needed
    pub fn needs_reading(&self) -> bool {
        self.available != Some(false)
    }

    /// Feed one successful poll. `reading` is the reported dB value (None
    /// when the platform gave none); failed reads must not be fed here.
    /// Returns `None` when the indicator should keep its current value.
    pub fn observe(&mut self, reading: Option<f32>, since_start: Duration) -> Option<LevelReading> {
        if self.available == Some(false) {
            return Some(self.synthetic(since_start));
        }

        match reading {
            Some(db) => {
                self.available = Some(true);
                let level = normalize_db(db);
                Some(LevelReading {
                    level,
                    scale: scale_for_level(level),
                })
            }
            None if self.available == Some(true) => None,
            None => {
                self.polls_without_metering += 1;
                if self.polls_without_metering >= self.probe_samples {
                    self.available = Some(false);
                    Some(self.synthetic(since_start))
                } else {
                    None
                }
            }
        }
    }

    fn synthetic(&self, since_start: Duration) -> LevelReading {
        LevelReading {
            level: 0.0,
            scale: synthetic_scale(since_start, self.period),
        }
    }
}
