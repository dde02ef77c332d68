use super::events::{RecognitionEvent, Segment, TranscriptionResult};
use crate::recognizer::{NativeResult, NativeSegment, NativeTranscription};

fn to_segment(native: &NativeSegment) -> Segment {
    Segment {
        start_time_millis: native.timestamp * 1000.0,
        end_time_millis: (native.timestamp + native.duration) * 1000.0,
        text: native.substring.clone(),
        confidence: native.confidence,
    }
}

fn mean_confidence(segments: &[Segment]) -> f32 {
    if segments.is_empty() {
        return 0.0;
    }
    segments.iter().map(|s| s.confidence).sum::<f32>() / segments.len() as f32
}

pub fn to_transcription(native: &NativeTranscription) -> TranscriptionResult {
    let segments: Vec<Segment> = native.segments.iter().map(to_segment).collect();

    TranscriptionResult {
        transcript: native.formatted_string.clone(),
        confidence: mean_confidence(&segments),
        segments,
    }
}

/// Event for one recognizer callback
///
/// Alternatives with empty text are dropped first; a final result left with
/// no alternatives is a `NoMatch`.
pub fn translate_result(result: &NativeResult) -> RecognitionEvent {
    let alternatives: Vec<TranscriptionResult> = result
        .transcriptions
        .iter()
        .map(to_transcription)
        .filter(|t| !t.transcript.is_empty())
        .collect();

    if result.is_final && alternatives.is_empty() {
        return RecognitionEvent::NoMatch;
    }

    RecognitionEvent::Result {
        is_final: result.is_final,
        alternatives,
    }
}
