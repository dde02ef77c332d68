pub mod backend;
pub mod capture;
pub mod file;
pub mod writer;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioFrame, AudioInput, BackendFactory, DefaultBackendFactory};
pub use capture::AudioCaptureSource;
pub use file::{AudioFile, WavFileBackend};
pub use writer::AudioFileWriter;
