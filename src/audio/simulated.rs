use anyhow::{Context, Result};
use std::collections::HashMap;
use std::f32::consts::PI;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::backend::{
    CaptureBackend, CaptureHandle, CaptureOptions, CaptureStatus, FinalizedCapture, Permission,
};
use super::wav::WavFileWriter;

const TONE_HZ: f32 = 440.0;

/// Configuration for the simulated microphone
#[derive(Debug, Clone)]
pub struct SimulatedMicrophoneConfig {
    /// Directory the finished WAV files are written to
    pub output_dir: PathBuf,
    pub sample_rate: u32,
    /// Answer to permission requests
    pub grant_permission: bool,
    /// Report a loudness value in `read_status`
    pub metering: bool,
}

impl SimulatedMicrophoneConfig {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            sample_rate: 16000,
            grant_permission: true,
            metering: true,
        }
    }
}

struct OpenCapture {
    started_at: Instant,
    file_path: PathBuf,
    metering: bool,
    finalized: Option<FinalizedCapture>,
}

/// Microphone stand-in that synthesises a tone for as long as it "records"
/// and writes it out as a 16-bit mono WAV file on finalize.
pub struct SimulatedMicrophone {
    config: SimulatedMicrophoneConfig,
    captures: Mutex<HashMap<CaptureHandle, OpenCapture>>,
}

impl SimulatedMicrophone {
    pub fn new(config: SimulatedMicrophoneConfig) -> Self {
        Self {
            config,
            captures: Mutex::new(HashMap::new()),
        }
    }

    /// Number of captures that have been started but not released
    pub fn open_captures(&self) -> usize {
        self.captures.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn with_capture<T>(
        &self,
        handle: &CaptureHandle,
        f: impl FnOnce(&mut OpenCapture) -> T,
    ) -> Result<T> {
        let mut captures = self
            .captures
            .lock()
            .map_err(|_| anyhow::anyhow!("capture table poisoned"))?;
        let capture = captures
            .get_mut(handle)
            .with_context(|| format!("Unknown capture handle: {}", handle))?;
        Ok(f(capture))
    }
}

/// Slowly breathing loudness between roughly -50 and -10 dBFS
fn simulated_level_db(elapsed_ms: u64) -> f32 {
    let t = elapsed_ms as f32 / 1000.0;
    -30.0 + 20.0 * (t * 2.0 * PI * 0.7).sin()
}

/// Tone samples `start..start + count` of a recording at `sample_rate`
fn synthesize_tone(sample_rate: u32, start: u64, count: usize) -> Vec<i16> {
    (start..start + count as u64)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let envelope = 0.5 + 0.5 * (t * 2.0 * PI * 0.7).sin();
            let sample = (t * 2.0 * PI * TONE_HZ).sin() * envelope * 0.3;
            (sample * i16::MAX as f32) as i16
        })
        .collect()
}

/// Write `duration_ms` of tone, one second of samples at a time
fn write_tone(writer: &mut WavFileWriter, sample_rate: u32, duration_ms: u64) -> Result<()> {
    let total = sample_rate as u64 * duration_ms / 1000;
    let block = sample_rate.max(1) as u64;
    let mut written = 0;
    while written < total {
        let count = block.min(total - written);
        writer.write_samples(&synthesize_tone(sample_rate, written, count as usize))?;
        written += count;
    }
    Ok(())
}

#[async_trait::async_trait]
impl CaptureBackend for SimulatedMicrophone {
    async fn request_permission(&self) -> Result<Permission> {
        Ok(if self.config.grant_permission {
            Permission::Granted
        } else {
            Permission::Denied
        })
    }

    async fn start_capture(&self, options: CaptureOptions) -> Result<CaptureHandle> {
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .context("Failed to create recordings directory")?;

        let handle = CaptureHandle::new_random();
        let file_path = self
            .config
            .output_dir
            .join(format!("recording-{}.wav", handle));

        info!(
            %handle,
            exclusive = options.exclusive,
            mix_with_others = options.mix_with_others,
            "simulated capture started"
        );

        self.captures
            .lock()
            .map_err(|_| anyhow::anyhow!("capture table poisoned"))?
            .insert(
                handle.clone(),
                OpenCapture {
                    started_at: Instant::now(),
                    file_path,
                    metering: options.metering && self.config.metering,
                    finalized: None,
                },
            );

        Ok(handle)
    }

    async fn read_status(&self, handle: &CaptureHandle) -> Result<CaptureStatus> {
        self.with_capture(handle, |capture| {
            let elapsed_ms = match &capture.finalized {
                Some(done) => done.duration_ms,
                None => capture.started_at.elapsed().as_millis() as u64,
            };
            CaptureStatus {
                elapsed_ms,
                metering_db: capture.metering.then(|| simulated_level_db(elapsed_ms)),
            }
        })
    }

    async fn finalize(&self, handle: &CaptureHandle) -> Result<FinalizedCapture> {
        let (file_path, duration_ms, already) = self.with_capture(handle, |capture| {
            (
                capture.file_path.clone(),
                capture.started_at.elapsed().as_millis() as u64,
                capture.finalized.clone(),
            )
        })?;
        if let Some(done) = already {
            return Ok(done);
        }

        let sample_rate = self.config.sample_rate;
        let path = file_path.clone();
        let summary = tokio::task::spawn_blocking(move || {
            let mut writer = WavFileWriter::create(&path, sample_rate, 1)?;
            write_tone(&mut writer, sample_rate, duration_ms)?;
            writer.finish()
        })
        .await
        .context("WAV writer task panicked")??;

        let finalized = FinalizedCapture {
            uri: summary.file_path.display().to_string(),
            duration_ms,
        };
        self.with_capture(handle, |capture| capture.finalized = Some(finalized.clone()))?;

        Ok(finalized)
    }

    async fn release(&self, handle: &CaptureHandle) -> Result<()> {
        let removed = self
            .captures
            .lock()
            .map_err(|_| anyhow::anyhow!("capture table poisoned"))?
            .remove(handle);

        match removed {
            Some(capture) if capture.finalized.is_none() => {
                debug!(%handle, "released unfinished capture");
            }
            Some(_) => debug!(%handle, "released capture"),
            None => debug!(%handle, "release of unknown capture ignored"),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated-microphone"
    }
}
