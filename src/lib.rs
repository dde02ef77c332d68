pub mod audio;
pub mod config;
pub mod error;
pub mod locale;
pub mod platform;
pub mod recognizer;
pub mod service;
pub mod session;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioCaptureSource, AudioFile, AudioFileWriter, AudioFrame, AudioInput,
    BackendFactory, DefaultBackendFactory, WavFileBackend,
};
pub use config::Config;
pub use error::{classify, CaptureError, RecognitionError, SpeechErrorCode};
pub use locale::resolve_locale;
pub use platform::{
    AudioSessionConfig, AudioSessionConfigurator, NoopAudioSession, PermissionChecker, StaticPermissions,
};
pub use recognizer::{
    build_request, NativeError, NativeResult, NativeSegment, NativeTranscription, RecognitionRequest,
    RecognitionTask, RecognizerCallback, RecognizerCapabilities, RecognizerProvider, ReplayProvider,
    ReplayRecognizer, ReplayScript, SpeechRecognizer, TaskState,
};
pub use service::SpeechRecognitionService;
pub use session::{
    ChannelSink, Collaborators, ControllerSettings, EventSink, RecognitionEvent, RecognitionOptions,
    RecordingHook, RecordingOptions, AudioSourceOptions, Segment, SessionController, SessionState,
    TranscriptionResult,
};
