use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::backend::AudioFrame;

/// Sample rate used for a recording that never received a frame
const FALLBACK_SAMPLE_RATE: u32 = 16000;

/// Persists captured frames to a WAV file
///
/// The file is created lazily from the format of the first frame, so the
/// recording mirrors the live input without transcoding. Write failures are
/// logged and counted, never propagated.
pub struct AudioFileWriter {
    path: PathBuf,
    fallback_sample_rate: u32,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    format: Option<(u32, u16)>,
    frames_written: usize,
    write_failures: usize,
}

impl AudioFileWriter {
    /// Writer for `output_path`, or a generated `recording-<uuid>.wav` under `default_dir`
    pub fn new(output_path: Option<PathBuf>, default_dir: &Path) -> Self {
        let path = output_path
            .unwrap_or_else(|| default_dir.join(format!("recording-{}.wav", uuid::Uuid::new_v4())));

        Self {
            path,
            fallback_sample_rate: FALLBACK_SAMPLE_RATE,
            writer: None,
            format: None,
            frames_written: 0,
            write_failures: 0,
        }
    }

    /// Sample rate used when the recording closes without any input
    pub fn with_fallback_sample_rate(mut self, sample_rate: u32) -> Self {
        self.fallback_sample_rate = sample_rate;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn write_failures(&self) -> usize {
        self.write_failures
    }

    /// Append one frame, creating the file on first use
    pub fn write_frame(&mut self, frame: &AudioFrame) {
        if let Err(e) = self.try_write_frame(frame) {
            self.write_failures += 1;
            warn!("Failed to write audio frame to {}: {:#}", self.path.display(), e);
        }
    }

    fn try_write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if self.writer.is_none() {
            self.create(frame.sample_rate, frame.channels)?;
        }

        if let Some((sample_rate, channels)) = self.format {
            if frame.sample_rate != sample_rate || frame.channels != channels {
                anyhow::bail!(
                    "Frame format {}Hz/{}ch does not match recording format {}Hz/{}ch",
                    frame.sample_rate,
                    frame.channels,
                    sample_rate,
                    channels
                );
            }
        }

        if let Some(writer) = &mut self.writer {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.frames_written += 1;
        }

        Ok(())
    }

    fn create(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create recordings directory")?;
            }
        }

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&self.path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", self.path))?;

        info!(
            "Recording audio to {} ({}Hz, {} channels)",
            self.path.display(),
            sample_rate,
            channels
        );

        self.writer = Some(writer);
        self.format = Some((sample_rate, channels));
        Ok(())
    }

    /// Close the file and return its path
    ///
    /// A recording that never received a frame is still written as an empty
    /// mono WAV so the advertised path exists.
    pub fn finish(mut self) -> Result<PathBuf> {
        if self.writer.is_none() {
            self.create(self.fallback_sample_rate, 1)?;
        }

        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }

        info!(
            "Recording closed: {} ({} frames, {} write failures)",
            self.path.display(),
            self.frames_written,
            self.write_failures
        );

        Ok(self.path.clone())
    }
}

impl Drop for AudioFileWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
