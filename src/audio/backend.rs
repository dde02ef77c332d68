use anyhow::Result;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Number of sample frames (samples per channel) in this buffer
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Configuration for an input engine
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Requested sample rate (backends may deliver their native rate instead)
    pub target_sample_rate: u32,
    /// Requested channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Tap buffer size in sample frames
    pub buffer_size: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000,
            target_channels: 1,
            buffer_size: 1024,
        }
    }
}

impl AudioBackendConfig {
    /// Duration of one tap buffer in milliseconds
    pub fn buffer_duration_ms(&self) -> u64 {
        if self.target_sample_rate == 0 {
            return 0;
        }
        self.buffer_size as u64 * 1000 / self.target_sample_rate as u64
    }
}

/// Live audio input engine
///
/// Implementations:
/// - `WavFileBackend`: plays a WAV file as if it were an input device
/// - `MicrophoneBackend` (feature `microphone`): default input device via cpal
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Opens a live input engine for a session
pub trait BackendFactory: Send + Sync {
    fn create(&self, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>>;
}

/// Audio input selection for the default factory
#[derive(Debug, Clone)]
pub enum AudioInput {
    /// Default input device (requires the `microphone` feature)
    Microphone,
    /// WAV file played back as a live input
    WavFile { path: String, realtime: bool },
}

/// Factory that opens the configured input for every session
pub struct DefaultBackendFactory {
    input: AudioInput,
}

impl DefaultBackendFactory {
    pub fn new(input: AudioInput) -> Self {
        Self { input }
    }
}

impl BackendFactory for DefaultBackendFactory {
    fn create(&self, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        match &self.input {
            AudioInput::Microphone => {
                #[cfg(feature = "microphone")]
                {
                    use super::microphone::MicrophoneBackend;
                    Ok(Box::new(MicrophoneBackend::new(config)))
                }

                #[cfg(not(feature = "microphone"))]
                {
                    let _ = config;
                    anyhow::bail!("Microphone capture requires the `microphone` feature")
                }
            }

            AudioInput::WavFile { path, realtime } => {
                let backend = super::file::WavFileBackend::open(path, config)?.realtime(*realtime);
                Ok(Box::new(backend))
            }
        }
    }
}
