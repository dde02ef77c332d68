use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::path::Path;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            bail!(
                "Unsupported WAV format: {:?} {} bits (expected 16-bit PCM)",
                spec.sample_format,
                spec.bits_per_sample
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split the file into tap-sized frames with capture timestamps
    pub fn frames(&self, buffer_size: usize) -> Vec<AudioFrame> {
        let chunk_len = buffer_size.max(1) * self.channels.max(1) as usize;
        let mut frames = Vec::with_capacity(self.samples.len() / chunk_len + 1);
        let mut emitted = 0usize;

        for chunk in self.samples.chunks(chunk_len) {
            let timestamp_ms =
                emitted as u64 * 1000 / (self.sample_rate as u64 * self.channels.max(1) as u64).max(1);
            frames.push(AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms,
            });
            emitted += chunk.len();
        }

        frames
    }
}

/// Input engine that plays a WAV file as if it were a live device
pub struct WavFileBackend {
    file: AudioFile,
    config: AudioBackendConfig,
    realtime: bool,
    playback: Option<(oneshot::Sender<()>, JoinHandle<()>)>,
}

impl WavFileBackend {
    pub fn open(path: impl AsRef<Path>, config: AudioBackendConfig) -> Result<Self> {
        let file = AudioFile::open(path)?;
        Ok(Self {
            file,
            config,
            realtime: false,
            playback: None,
        })
    }

    /// Pace frames at the file's real duration instead of as fast as possible
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}

#[async_trait::async_trait]
impl AudioBackend for WavFileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.playback.is_some() {
            bail!("Already capturing");
        }

        let frames = self.file.frames(self.config.buffer_size);
        let pace = Duration::from_millis(self.config.buffer_size as u64 * 1000 / self.file.sample_rate.max(1) as u64);
        let realtime = self.realtime;

        info!(
            "Starting WAV playback input: {} ({} frames, realtime={})",
            self.file.path,
            frames.len(),
            realtime
        );

        let (tx, rx) = mpsc::channel(100);
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            for frame in frames {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    sent = tx.send(frame) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
                if realtime {
                    tokio::time::sleep(pace).await;
                }
            }
            debug!("WAV playback input drained");
        });

        self.playback = Some((stop_tx, handle));
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some((stop_tx, handle)) = self.playback.take() {
            let _ = stop_tx.send(());
            handle.await.context("WAV playback task panicked")?;
            info!("WAV playback input stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.playback
            .as_ref()
            .map(|(_, handle)| !handle.is_finished())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "WAV file input"
    }
}
