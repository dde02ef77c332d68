use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::RecognitionError;

/// A transcribed span in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub start_time_millis: f64,
    pub end_time_millis: f64,
    pub text: String,
    pub confidence: f32,
}

/// One alternative of a recognition result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub transcript: String,
    /// Mean of the segment confidences, 0 without segments
    pub confidence: f32,
    pub segments: Vec<Segment>,
}

/// Events delivered to the sink, in production order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecognitionEvent {
    Start,
    SpeechStart,
    AudioStart {
        uri: Option<String>,
    },
    AudioEnd {
        uri: Option<String>,
    },
    Result {
        #[serde(rename = "isFinal")]
        is_final: bool,
        alternatives: Vec<TranscriptionResult>,
    },
    NoMatch,
    Error(RecognitionError),
    End,
}

impl RecognitionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RecognitionEvent::Start => "start",
            RecognitionEvent::SpeechStart => "speechstart",
            RecognitionEvent::AudioStart { .. } => "audiostart",
            RecognitionEvent::AudioEnd { .. } => "audioend",
            RecognitionEvent::Result { .. } => "result",
            RecognitionEvent::NoMatch => "nomatch",
            RecognitionEvent::Error(_) => "error",
            RecognitionEvent::End => "end",
        }
    }
}

/// Receiver of session events
///
/// Called from the controller's serialized context; implementations decide
/// which execution context actually processes the event.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RecognitionEvent);
}

/// Sink that forwards events into a channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RecognitionEvent>,
}

impl ChannelSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<RecognitionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: RecognitionEvent) {
        // The receiver going away only means nobody is listening anymore
        let _ = self.tx.send(event);
    }
}

/// Sink that only logs
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: RecognitionEvent) {
        info!("Recognition event: {:?}", event);
    }
}

/// Invoked once, on a blocking thread, with the path of a persisted recording
pub type RecordingHook = Box<dyn FnOnce(std::path::PathBuf) + Send>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpeechErrorCode;

    #[test]
    fn test_result_event_json_shape() {
        let event = RecognitionEvent::Result {
            is_final: true,
            alternatives: vec![TranscriptionResult {
                transcript: "hello".to_string(),
                confidence: 0.5,
                segments: vec![Segment {
                    start_time_millis: 0.0,
                    end_time_millis: 250.0,
                    text: "hello".to_string(),
                    confidence: 0.5,
                }],
            }],
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"result\""));
        assert!(json.contains("\"isFinal\":true"));
        assert!(json.contains("\"startTimeMillis\":0.0"));
    }

    #[test]
    fn test_error_event_carries_code() {
        let event = RecognitionEvent::Error(RecognitionError::new(SpeechErrorCode::NoSpeech, "No speech detected"));
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("\"code\":\"no-speech\""));
        assert_eq!(event.name(), "error");
    }

    #[tokio::test]
    async fn test_channel_sink_preserves_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(RecognitionEvent::Start);
        sink.emit(RecognitionEvent::End);

        assert_eq!(rx.recv().await, Some(RecognitionEvent::Start));
        assert_eq!(rx.recv().await, Some(RecognitionEvent::End));
    }
}
