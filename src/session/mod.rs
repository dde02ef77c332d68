//! Recognition session management
//!
//! This module provides the `SessionController` state machine that owns:
//! - The recognition request and task for one session
//! - The live input tap and optional recording writer
//! - The silence watchdog for non-continuous sessions
//! - Translation of recognizer callbacks into `RecognitionEvent`s

mod config;
mod controller;
mod events;
mod state;
mod translate;
mod watchdog;

pub use config::{AudioSourceOptions, RecognitionOptions, RecordingOptions};
pub use controller::{Collaborators, ControllerSettings, SessionController, DEFAULT_SILENCE_TIMEOUT};
pub use events::{ChannelSink, EventSink, LogSink, RecognitionEvent, RecordingHook, Segment, TranscriptionResult};
pub use state::SessionState;
pub use translate::{to_transcription, translate_result};
pub use watchdog::SilenceWatchdog;
