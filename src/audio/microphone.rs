// Default input device capture via cpal
//
// cpal streams are not Send, so the stream lives on a dedicated thread that
// waits for a stop command and drops the stream on exit.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    worker: Option<(std_mpsc::Sender<()>, JoinHandle<()>)>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self { config, worker: None }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.worker.is_some() {
            bail!("Already capturing");
        }

        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();
        let buffer_size = self.config.buffer_size;

        let handle = thread::spawn(move || {
            let stream = match open_stream(frame_tx, buffer_size) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            // Block until stop() or the backend is dropped
            let _ = stop_rx.recv();
            drop(stream);
            info!("Microphone stream stopped");
        });

        tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .context("Microphone startup task panicked")?
            .map_err(|_| anyhow!("Microphone thread exited during startup"))??;

        self.worker = Some((stop_tx, handle));
        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some((stop_tx, handle)) = self.worker.take() {
            let _ = stop_tx.send(());
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .context("Microphone shutdown task panicked")?
                .map_err(|_| anyhow!("Microphone thread panicked"))?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "cpal default input"
    }
}

fn open_stream(frame_tx: mpsc::Sender<AudioFrame>, buffer_size: usize) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    let config = device
        .default_input_config()
        .context("Failed to query default input config")?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels();
    info!(
        "Using input device: {:?} ({}Hz, {} channels, {:?})",
        device.name().ok(),
        sample_rate,
        channels,
        config.sample_format()
    );

    let started = Instant::now();
    let chunk_len = buffer_size.max(1) * channels as usize;
    let mut pending: Vec<i16> = Vec::with_capacity(chunk_len);
    let mut lost = 0usize;

    let mut push = move |samples: &mut dyn Iterator<Item = i16>| {
        for sample in samples {
            pending.push(sample);
            if pending.len() == chunk_len {
                let frame = AudioFrame {
                    samples: std::mem::replace(&mut pending, Vec::with_capacity(chunk_len)),
                    sample_rate,
                    channels,
                    timestamp_ms: started.elapsed().as_millis() as u64,
                };
                // The device thread cannot wait for a consumer that is behind
                if let Err(mpsc::error::TrySendError::Full(_)) = frame_tx.try_send(frame) {
                    lost += 1;
                    if lost.is_power_of_two() {
                        warn!("Input consumer is behind, {} frames lost so far", lost);
                    }
                }
            }
        }
    };

    let err_fn = |err| error!("Audio stream error: {}", err);

    let stream = match config.sample_format() {
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config.into(),
            move |data: &[i16], _: &cpal::InputCallbackInfo| push(&mut data.iter().copied()),
            err_fn,
            None,
        ),
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                push(&mut data.iter().map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            },
            err_fn,
            None,
        ),
        other => bail!("Unsupported input sample format: {:?}", other),
    }
    .context("Failed to build input stream")?;

    stream.play().context("Failed to start input stream")?;
    Ok(stream)
}
