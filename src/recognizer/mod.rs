//! Platform speech recognizer abstraction
//!
//! The recognizer is an opaque capability: it accepts a `RecognitionRequest`
//! (streamed frames or a file URI) and reports progress through a callback
//! channel of `RecognizerCallback` values until it finishes, fails or is
//! cancelled.

pub mod replay;
pub mod request;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

pub use replay::{ReplayProvider, ReplayRecognizer, ReplayScript, ScriptStep, ScriptedCallback};
pub use request::{build_request, RecognitionRequest, RequestSource, STREAM_CAPACITY};

/// Native code the platform reports for a cancelled request
pub const REQUEST_CANCELED_CODE: i64 = 301;

/// A word or phrase span as reported by the recognizer, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeSegment {
    pub substring: String,
    pub timestamp: f64,
    pub duration: f64,
    pub confidence: f32,
}

/// One hypothesis of the recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeTranscription {
    pub formatted_string: String,
    #[serde(default)]
    pub segments: Vec<NativeSegment>,
}

/// Payload of a non-error callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeResult {
    pub is_final: bool,
    pub transcriptions: Vec<NativeTranscription>,
}

/// Error reported by the platform recognizer
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("recognizer error {code}: {message}")]
pub struct NativeError {
    pub code: i64,
    pub message: String,
}

impl NativeError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_request_canceled(&self) -> bool {
        self.code == REQUEST_CANCELED_CODE
    }
}

pub type RecognizerCallback = Result<NativeResult, NativeError>;

/// Lifecycle of a recognition task as the platform reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Starting,
    Running,
    Finishing,
    Canceling,
    Completed,
}

/// Optional recognizer features, queried once per request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecognizerCapabilities {
    pub supports_on_device_recognition: bool,
    pub supports_punctuation: bool,
}

/// Handle to a running recognition job
pub trait RecognitionTask: Send + Sync {
    fn state(&self) -> TaskState;

    /// Stop accepting audio and deliver a final result
    fn finish(&mut self);

    /// Abandon recognition; no further results are delivered
    fn cancel(&mut self);
}

/// Recognizer bound to one locale
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    fn locale(&self) -> &str;

    fn is_available(&self) -> bool;

    fn capabilities(&self) -> RecognizerCapabilities;

    /// Create a task for `request`
    ///
    /// Streaming requests hand their audio receiver over to the task.
    /// Callbacks are delivered on `callbacks` until the task completes, at
    /// which point the sender is dropped.
    async fn start_task(
        &self,
        request: &mut RecognitionRequest,
        callbacks: mpsc::UnboundedSender<RecognizerCallback>,
    ) -> Result<Box<dyn RecognitionTask>, NativeError>;
}

/// Locale catalog and recognizer construction
pub trait RecognizerProvider: Send + Sync {
    fn supported_locales(&self) -> Vec<String>;

    fn recognizer_for(&self, locale: &str) -> Option<Arc<dyn SpeechRecognizer>>;
}
