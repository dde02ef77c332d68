use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::backend::{AudioBackend, AudioFrame};
use super::writer::AudioFileWriter;
use crate::error::CaptureError;
use crate::platform::{AudioSessionConfig, AudioSessionConfigurator};
use crate::recognizer::RecognitionRequest;

/// Longest a stopping tap waits for the recognizer to take queued frames
const FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

struct Tap {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<Option<AudioFileWriter>>,
}

/// Live input owned by a session
///
/// Installs a single tap on the input engine that forwards every frame to
/// the request's streaming sink and, when recording, to the file writer.
pub struct AudioCaptureSource {
    backend: Box<dyn AudioBackend>,
    audio_session: Arc<dyn AudioSessionConfigurator>,
    tap: Option<Tap>,
}

impl AudioCaptureSource {
    pub fn new(backend: Box<dyn AudioBackend>, audio_session: Arc<dyn AudioSessionConfigurator>) -> Self {
        Self {
            backend,
            audio_session,
            tap: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.tap.is_some()
    }

    /// Configure the audio session, install the tap and start the engine
    pub async fn start(
        &mut self,
        request: &mut RecognitionRequest,
        writer: Option<AudioFileWriter>,
    ) -> Result<(), CaptureError> {
        if self.tap.is_some() {
            return Err(CaptureError::TapAlreadyInstalled);
        }

        let sink = request
            .take_audio_sender()
            .ok_or(CaptureError::InvalidAudioSource)?;

        self.audio_session
            .apply(&AudioSessionConfig::record_speech())
            .map_err(CaptureError::AudioSession)?;

        let frames = self.backend.start().await.map_err(CaptureError::Engine)?;

        info!(
            "Input tap installed on {} (recording={})",
            self.backend.name(),
            writer.is_some()
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_tap(frames, sink, writer, stop_rx));

        self.tap = Some(Tap { stop_tx, handle });
        Ok(())
    }

    /// Stop the engine and remove the tap
    ///
    /// Frames the engine captured before stopping are still written and
    /// forwarded. Returns the recording writer, if one was attached, so the
    /// caller can close it.
    pub async fn stop(&mut self) -> Option<AudioFileWriter> {
        if let Err(e) = self.backend.stop().await {
            warn!("Failed to stop audio engine {}: {:#}", self.backend.name(), e);
        }

        let tap = self.tap.take()?;
        let _ = tap.stop_tx.send(());
        match tap.handle.await {
            Ok(writer) => writer,
            Err(e) => {
                error!("Input tap task panicked: {}", e);
                None
            }
        }
    }
}

async fn run_tap(
    mut frames: mpsc::Receiver<AudioFrame>,
    sink: mpsc::Sender<AudioFrame>,
    mut writer: Option<AudioFileWriter>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Option<AudioFileWriter> {
    let mut sink = Some(sink);
    // Written to the recording but not yet accepted by the recognizer
    let mut pending: Option<AudioFrame> = None;
    let mut forwarded = 0usize;

    // A recognizer that falls behind holds the tap back instead of losing audio
    loop {
        let Some(frame) = pending.take() else {
            tokio::select! {
                biased;

                _ = &mut stop_rx => break,

                frame = frames.recv() => match frame {
                    Some(frame) => {
                        if let Some(writer) = writer.as_mut() {
                            writer.write_frame(&frame);
                        }
                        pending = Some(frame);
                    }
                    None => {
                        debug!("Input engine closed its stream");
                        break;
                    }
                },
            }
            continue;
        };

        let Some(tx) = sink.as_ref() else {
            continue;
        };

        let mut closed = false;
        tokio::select! {
            biased;

            _ = &mut stop_rx => {
                pending = Some(frame);
                break;
            }

            permit = tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(frame);
                    forwarded += 1;
                }
                Err(_) => closed = true,
            },
        }
        if closed {
            debug!("Recognizer stopped consuming audio");
            sink = None;
        }
    }

    // Flush what the engine captured before it stopped
    frames.close();
    let deadline = Instant::now() + FLUSH_TIMEOUT;
    let mut flushed = 0usize;
    loop {
        let frame = match pending.take() {
            Some(frame) => frame,
            None => match frames.recv().await {
                Some(frame) => {
                    if let Some(writer) = writer.as_mut() {
                        writer.write_frame(&frame);
                    }
                    flushed += 1;
                    frame
                }
                None => break,
            },
        };

        let Some(tx) = sink.as_ref() else {
            continue;
        };

        let accepted = match tokio::time::timeout_at(deadline, tx.reserve()).await {
            Ok(Ok(permit)) => {
                permit.send(frame);
                true
            }
            Ok(Err(_)) => false,
            Err(_) => {
                warn!("Recognizer did not take the remaining audio within {:?}", FLUSH_TIMEOUT);
                false
            }
        };
        if accepted {
            forwarded += 1;
        } else {
            sink = None;
        }
    }

    info!(
        "Input tap removed ({} frames forwarded, {} flushed after stop)",
        forwarded, flushed
    );
    writer
}
