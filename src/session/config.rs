use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for one recognition session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionOptions {
    /// Requested locale identifier (e.g., "en-US" or "en_US")
    pub lang: String,

    /// Report partial results while speech is in progress
    #[serde(default)]
    pub interim_results: bool,

    /// Keep recognizing through silence instead of stopping after the
    /// silence window
    #[serde(default)]
    pub continuous: bool,

    /// Ask the recognizer not to use a network service
    #[serde(default)]
    pub requires_on_device_recognition: bool,

    /// Phrases that should be recognized preferentially, in priority order
    #[serde(default)]
    pub contextual_strings: Option<Vec<String>>,

    #[serde(default)]
    pub adds_punctuation: bool,

    /// Transcribe a file instead of live input
    #[serde(default)]
    pub audio_source: Option<AudioSourceOptions>,

    /// Persist the live input to a WAV file
    #[serde(default)]
    pub recording_options: Option<RecordingOptions>,
}

impl RecognitionOptions {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            interim_results: false,
            continuous: false,
            requires_on_device_recognition: false,
            contextual_strings: None,
            adds_punctuation: false,
            audio_source: None,
            recording_options: None,
        }
    }

    /// Whether the session reads a file rather than live input
    pub fn is_file_source(&self) -> bool {
        self.audio_source.is_some()
    }

    /// Whether silence stops the session
    ///
    /// File transcription has no live silence to watch for.
    pub fn uses_silence_timeout(&self) -> bool {
        !self.continuous && !self.is_file_source()
    }

    /// Recording settings when persistence is enabled for a live session
    pub fn persisted_recording(&self) -> Option<&RecordingOptions> {
        if self.is_file_source() {
            return None;
        }
        self.recording_options.as_ref().filter(|r| r.persist)
    }
}

/// Pre-recorded input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSourceOptions {
    pub uri: String,
    #[serde(default)]
    pub audio_channels: Option<u16>,
    #[serde(default)]
    pub audio_encoding: Option<String>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
}

impl AudioSourceOptions {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            audio_channels: None,
            audio_encoding: None,
            sample_rate: None,
        }
    }
}

/// Persistence of captured audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOptions {
    pub persist: bool,
    /// Destination file; generated under the recordings directory when absent
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Sample rate hint for a recording that captures no audio
    #[serde(default)]
    pub sample_rate: Option<u32>,
    /// Only 16-bit PCM is written; kept for parity with the input hints
    #[serde(default)]
    pub encoding: Option<String>,
}

impl RecordingOptions {
    pub fn persist_to(output_path: Option<PathBuf>) -> Self {
        Self {
            persist: true,
            output_path,
            sample_rate: None,
            encoding: None,
        }
    }
}
