use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use crate::recognizer::NativeError;

/// Error codes surfaced to the event sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechErrorCode {
    /// Requested locale is not in the supported set
    LanguageNotSupported,
    /// Speech or microphone permission missing, or not authorized to recognize
    NotAllowed,
    /// Recognizer unavailable, or assets/dictation disabled
    ServiceNotAllowed,
    /// Invalid audio source or a generic recognition failure
    AudioCapture,
    /// Another recognition attempt is still active
    Busy,
    /// Connection to the recognition backend was lost
    Network,
    /// No speech was detected
    NoSpeech,
    /// Session was aborted by the caller
    Aborted,
}

impl SpeechErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechErrorCode::LanguageNotSupported => "language-not-supported",
            SpeechErrorCode::NotAllowed => "not-allowed",
            SpeechErrorCode::ServiceNotAllowed => "service-not-allowed",
            SpeechErrorCode::AudioCapture => "audio-capture",
            SpeechErrorCode::Busy => "busy",
            SpeechErrorCode::Network => "network",
            SpeechErrorCode::NoSpeech => "no-speech",
            SpeechErrorCode::Aborted => "aborted",
        }
    }
}

impl Display for SpeechErrorCode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an `Error` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionError {
    pub code: SpeechErrorCode,
    pub message: String,
}

impl RecognitionError {
    pub fn new(code: SpeechErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn aborted() -> Self {
        Self::new(SpeechErrorCode::Aborted, "Speech recognition aborted.")
    }
}

impl Display for RecognitionError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RecognitionError {}

/// Map a platform error onto the public taxonomy
///
/// Returns `None` for the request-canceled code, which is what a normal
/// abort looks like from the platform side.
pub fn classify(error: &NativeError) -> Option<RecognitionError> {
    let (code, message) = match error.code {
        102 => (SpeechErrorCode::ServiceNotAllowed, "Assets are not installed."),
        201 => (SpeechErrorCode::ServiceNotAllowed, "Siri or Dictation is disabled."),
        203 => (SpeechErrorCode::AudioCapture, "Failure occurred during speech recognition."),
        300 => (SpeechErrorCode::AudioCapture, "Failed to initialize recognizer."),
        301 => return None,
        1100 => (
            SpeechErrorCode::Busy,
            "Trying to start recognition while an earlier instance is still active.",
        ),
        1101 => (SpeechErrorCode::Network, "Connection to speech process was invalidated."),
        1107 => (SpeechErrorCode::Network, "Connection to speech process was interrupted."),
        1110 => (SpeechErrorCode::NoSpeech, "No speech detected."),
        1700 => (SpeechErrorCode::NotAllowed, "Request is not authorized."),
        _ => return Some(RecognitionError::new(SpeechErrorCode::AudioCapture, error.message.clone())),
    };

    Some(RecognitionError::new(code, message))
}

/// Typed failures of the input tap
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("invalid audio source: the request does not accept streamed audio")]
    InvalidAudioSource,
    #[error("an input tap is already installed")]
    TapAlreadyInstalled,
    #[error("failed to apply audio session configuration: {0:#}")]
    AudioSession(anyhow::Error),
    #[error("audio engine failed to start: {0:#}")]
    Engine(anyhow::Error),
}

impl CaptureError {
    pub fn to_recognition_error(&self) -> RecognitionError {
        RecognitionError::new(SpeechErrorCode::AudioCapture, self.to_string())
    }
}
