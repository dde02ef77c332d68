use tokio::sync::mpsc;
use tracing::debug;

use super::RecognizerCapabilities;
use crate::audio::AudioFrame;
use crate::session::{AudioSourceOptions, RecognitionOptions};

/// Capacity of the streaming buffer between the input tap and the task
///
/// A full buffer holds the tap back until the recognizer catches up.
pub const STREAM_CAPACITY: usize = 100;

/// Where the recognizer reads audio from
#[derive(Debug)]
pub enum RequestSource {
    /// Frames appended by the input tap
    Stream {
        sender: Option<mpsc::Sender<AudioFrame>>,
        receiver: Option<mpsc::Receiver<AudioFrame>>,
    },
    /// Pre-recorded file
    File { source: AudioSourceOptions },
}

/// Platform recognition request
#[derive(Debug)]
pub struct RecognitionRequest {
    pub source: RequestSource,
    pub should_report_partial_results: bool,
    pub requires_on_device_recognition: bool,
    pub contextual_strings: Option<Vec<String>>,
    pub adds_punctuation: bool,
}

impl RecognitionRequest {
    pub fn is_streaming(&self) -> bool {
        matches!(self.source, RequestSource::Stream { .. })
    }

    pub fn file_uri(&self) -> Option<&str> {
        match &self.source {
            RequestSource::File { source } => Some(source.uri.as_str()),
            RequestSource::Stream { .. } => None,
        }
    }

    /// Sink the input tap appends frames to (streaming requests only)
    pub fn take_audio_sender(&mut self) -> Option<mpsc::Sender<AudioFrame>> {
        match &mut self.source {
            RequestSource::Stream { sender, .. } => sender.take(),
            RequestSource::File { .. } => None,
        }
    }

    /// Frames consumed by the recognition task (streaming requests only)
    pub fn take_audio_receiver(&mut self) -> Option<mpsc::Receiver<AudioFrame>> {
        match &mut self.source {
            RequestSource::Stream { receiver, .. } => receiver.take(),
            RequestSource::File { .. } => None,
        }
    }

    /// Signal that no more audio will be appended
    pub fn end_audio(&mut self) {
        if let RequestSource::Stream { sender, .. } = &mut self.source {
            sender.take();
        }
    }
}

/// Translate session options into a platform request
///
/// Options the recognizer cannot honor are dropped silently.
pub fn build_request(
    options: &RecognitionOptions,
    capabilities: RecognizerCapabilities,
) -> RecognitionRequest {
    let source = match &options.audio_source {
        Some(source) => RequestSource::File {
            source: source.clone(),
        },
        None => {
            let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
            RequestSource::Stream {
                sender: Some(tx),
                receiver: Some(rx),
            }
        }
    };

    let requires_on_device_recognition =
        options.requires_on_device_recognition && capabilities.supports_on_device_recognition;
    if options.requires_on_device_recognition && !requires_on_device_recognition {
        debug!("On-device recognition not supported, ignoring option");
    }

    let contextual_strings = options
        .contextual_strings
        .as_ref()
        .filter(|strings| !strings.is_empty())
        .cloned();

    let adds_punctuation = options.adds_punctuation && capabilities.supports_punctuation;
    if options.adds_punctuation && !adds_punctuation {
        debug!("Punctuation not supported, ignoring option");
    }

    RecognitionRequest {
        source,
        should_report_partial_results: options.interim_results,
        requires_on_device_recognition,
        contextual_strings,
        adds_punctuation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_capabilities() -> RecognizerCapabilities {
        RecognizerCapabilities {
            supports_on_device_recognition: true,
            supports_punctuation: true,
        }
    }

    #[test]
    fn test_stream_request_without_audio_source() {
        let options = RecognitionOptions::new("en-US");
        let mut request = build_request(&options, all_capabilities());

        assert!(request.is_streaming());
        assert!(request.file_uri().is_none());
        assert!(request.take_audio_sender().is_some());
        assert!(request.take_audio_sender().is_none());
        assert!(request.take_audio_receiver().is_some());
    }

    #[test]
    fn test_file_request_from_audio_source() {
        let mut options = RecognitionOptions::new("en-US");
        options.audio_source = Some(AudioSourceOptions::new("file:///tmp/speech.wav"));

        let mut request = build_request(&options, all_capabilities());

        assert!(!request.is_streaming());
        assert_eq!(request.file_uri(), Some("file:///tmp/speech.wav"));
        assert!(request.take_audio_sender().is_none());
    }

    #[test]
    fn test_end_audio_drops_sender() {
        let options = RecognitionOptions::new("en-US");
        let mut request = build_request(&options, all_capabilities());

        request.end_audio();
        assert!(request.take_audio_sender().is_none());
        assert!(request.take_audio_receiver().is_some());
    }
}
