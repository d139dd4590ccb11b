use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Summary of a finished WAV file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavSummary {
    pub file_path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    /// Number of interleaved samples written
    pub sample_count: usize,
}

impl WavSummary {
    pub fn duration_ms(&self) -> u64 {
        let frames = self.sample_count as u64 / self.channels.max(1) as u64;
        frames * 1000 / self.sample_rate.max(1) as u64
    }
}

/// Writes 16-bit PCM samples to a WAV file
pub struct WavFileWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    summary: WavSummary,
}

impl WavFileWriter {
    pub fn create(file_path: impl AsRef<Path>, sample_rate: u32, channels: u16) -> Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&file_path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", file_path))?;

        Ok(Self {
            writer: Some(writer),
            summary: WavSummary {
                file_path,
                sample_rate,
                channels,
                sample_count: 0,
            },
        })
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.summary.sample_count += samples.len();
        }

        Ok(())
    }

    pub fn finish(mut self) -> Result<WavSummary> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }

        info!(
            "WAV file written: {} ({:.1}s, {} samples)",
            self.summary.file_path.display(),
            self.summary.duration_ms() as f64 / 1000.0,
            self.summary.sample_count
        );

        Ok(self.summary.clone())
    }
}

impl Drop for WavFileWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
