use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info, warn};

use super::config::RecognitionOptions;
use super::events::{EventSink, RecognitionEvent, RecordingHook};
use super::state::SessionState;
use super::translate::translate_result;
use super::watchdog::SilenceWatchdog;
use crate::audio::{AudioBackendConfig, AudioCaptureSource, AudioFileWriter, BackendFactory};
use crate::error::{classify, CaptureError, RecognitionError, SpeechErrorCode};
use crate::platform::{AudioSessionConfigurator, PermissionChecker};
use crate::recognizer::{build_request, RecognitionRequest, RecognitionTask, RecognizerCallback, SpeechRecognizer, TaskState};

/// Silence window for non-continuous sessions
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_secs(3);

/// Tunables shared by every session of a controller
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub silence_timeout: Duration,
    pub backend: AudioBackendConfig,
    /// Directory for recordings without an explicit output path
    pub recordings_dir: PathBuf,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        let recordings_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("speech-session")
            .join("recordings");

        Self {
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
            backend: AudioBackendConfig::default(),
            recordings_dir,
        }
    }
}

/// Platform capabilities the controller depends on
#[derive(Clone)]
pub struct Collaborators {
    pub permissions: Arc<dyn PermissionChecker>,
    pub audio_session: Arc<dyn AudioSessionConfigurator>,
    pub backends: Arc<dyn BackendFactory>,
}

/// Resources of one start-to-End lifecycle
struct ActiveSession {
    options: RecognitionOptions,
    sink: Arc<dyn EventSink>,
    recording_hook: Option<RecordingHook>,
    request: Option<RecognitionRequest>,
    task: Option<Box<dyn RecognitionTask>>,
    capture: Option<AudioCaptureSource>,
    /// Writer detached from the tap by a graceful stop, closed on reset
    writer: Option<AudioFileWriter>,
    watchdog: Option<SilenceWatchdog>,
    live: bool,
    speech_started: bool,
    stopping: bool,
    /// Dropped on reset, which ends the session driver
    _shutdown: oneshot::Sender<()>,
}

impl ActiveSession {
    fn emit(&self, event: RecognitionEvent) {
        debug!("Emitting {} event", event.name());
        self.sink.emit(event);
    }
}

struct Inner {
    epoch: u64,
    session: Option<ActiveSession>,
}

/// State machine owning one recognition session at a time
///
/// All session state lives behind a single mutex. User calls, recognizer
/// callbacks and the silence timer each take that lock before touching it,
/// and asynchronous sources carry the epoch of the session they belong to so
/// that anything arriving after a reset is dropped.
#[derive(Clone)]
pub struct SessionController {
    locale: String,
    recognizer: Arc<dyn SpeechRecognizer>,
    collaborators: Collaborators,
    settings: ControllerSettings,
    inner: Arc<Mutex<Inner>>,
}

impl SessionController {
    pub fn new(
        locale: impl Into<String>,
        recognizer: Arc<dyn SpeechRecognizer>,
        collaborators: Collaborators,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            locale: locale.into(),
            recognizer,
            collaborators,
            settings,
            inner: Arc::new(Mutex::new(Inner {
                epoch: 0,
                session: None,
            })),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Start a session, replacing any session still active
    ///
    /// Never fails to the caller: problems are reported to `sink` as an
    /// `Error` event followed by `End`.
    pub async fn start(
        &self,
        options: RecognitionOptions,
        sink: Arc<dyn EventSink>,
        recording_hook: Option<RecordingHook>,
    ) {
        let (epoch, shutdown_rx) = {
            let mut inner = self.inner.lock().await;
            if inner.session.is_some() {
                info!("Replacing active recognition session");
                Self::reset_locked(&mut inner).await;
            }

            inner.epoch += 1;
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            inner.session = Some(ActiveSession {
                options: options.clone(),
                sink,
                recording_hook,
                request: None,
                task: None,
                capture: None,
                writer: None,
                watchdog: None,
                live: false,
                speech_started: false,
                stopping: false,
                _shutdown: shutdown_tx,
            });
            (inner.epoch, shutdown_rx)
        };

        info!(
            "Starting recognition session {} ({}, continuous={}, interim={}, file={})",
            epoch,
            self.locale,
            options.continuous,
            options.interim_results,
            options.is_file_source()
        );

        if let Err(error) = self.check_preconditions(&options).await {
            self.fail(epoch, error).await;
            return;
        }

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.epoch != epoch || inner.session.is_none() {
            debug!("Session {} ended before it started", epoch);
            return;
        }

        let mut request = build_request(&options, self.recognizer.capabilities());
        let (callback_tx, callback_rx) = mpsc::unbounded_channel();

        let task = match self.recognizer.start_task(&mut request, callback_tx).await {
            Ok(task) => task,
            Err(native) => {
                error!("Failed to create recognition task: {}", native);
                if let Some(session) = inner.session.as_ref() {
                    if let Some(error) = classify(&native) {
                        session.emit(RecognitionEvent::Error(error));
                    }
                }
                Self::reset_locked(inner).await;
                return;
            }
        };

        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let Some(session) = inner.session.as_mut() else {
            return;
        };
        session.task = Some(task);
        if options.uses_silence_timeout() {
            session.watchdog = Some(SilenceWatchdog::new(self.settings.silence_timeout, fired_tx));
        }

        tokio::spawn(self.clone().drive(epoch, callback_rx, fired_rx, shutdown_rx));

        let mut recording_uri = None;
        if !options.is_file_source() {
            match self.start_capture(&options, &mut request).await {
                Ok((capture, uri)) => {
                    session.capture = Some(capture);
                    session.live = true;
                    recording_uri = uri;
                }
                Err(capture_error) => {
                    error!("Failed to start audio capture: {}", capture_error);
                    session.request = Some(request);
                    session.emit(RecognitionEvent::Error(capture_error.to_recognition_error()));
                    Self::reset_locked(inner).await;
                    return;
                }
            }
        }
        session.request = Some(request);

        session.emit(RecognitionEvent::Start);
        if session.live {
            session.emit(RecognitionEvent::AudioStart { uri: recording_uri });
        }

        info!("Recognition session {} started", epoch);
    }

    /// Stop gracefully, letting the final result through
    pub async fn stop(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let Some(session) = inner.session.as_mut() else {
            debug!("Stop requested with no active session");
            return;
        };
        if session.stopping {
            return;
        }
        session.stopping = true;
        info!("Stopping recognition session {}", inner.epoch);

        if let Some(mut capture) = session.capture.take() {
            session.writer = capture.stop().await;
        }
        if let Some(request) = session.request.as_mut() {
            request.end_audio();
        }

        let finishing = match session.task.as_mut() {
            Some(task) if task.state() != TaskState::Completed => {
                task.finish();
                true
            }
            _ => false,
        };
        if !finishing {
            Self::reset_locked(inner).await;
        }
    }

    /// Stop immediately, reporting `aborted`
    ///
    /// A no-op without an active session.
    pub async fn abort(&self) {
        let mut inner = self.inner.lock().await;
        match inner.session.as_ref() {
            Some(session) => {
                info!("Aborting recognition session {}", inner.epoch);
                session.emit(RecognitionEvent::Error(RecognitionError::aborted()));
            }
            None => {
                debug!("Abort requested with no active session");
                return;
            }
        }
        Self::reset_locked(&mut inner).await;
    }

    /// Lifecycle state read from the recognition task
    ///
    /// A session still checking permissions has no task yet and reads as
    /// `Inactive`.
    pub async fn get_state(&self) -> SessionState {
        let inner = self.inner.lock().await;
        let Some(session) = inner.session.as_ref() else {
            return SessionState::Inactive;
        };
        let Some(task) = session.task.as_ref() else {
            return SessionState::Inactive;
        };

        match SessionState::from(task.state()) {
            SessionState::Recognizing if session.stopping => SessionState::Stopping,
            state => state,
        }
    }

    /// Tear down the active session, if any
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        Self::reset_locked(&mut inner).await;
    }

    async fn check_preconditions(&self, options: &RecognitionOptions) -> Result<(), RecognitionError> {
        let permissions = &self.collaborators.permissions;

        if !permissions.speech_recognition_granted().await {
            return Err(RecognitionError::new(
                SpeechErrorCode::NotAllowed,
                "Missing speech recognition permission.",
            ));
        }

        if !options.is_file_source() && !permissions.microphone_granted().await {
            return Err(RecognitionError::new(
                SpeechErrorCode::NotAllowed,
                "Missing microphone permission.",
            ));
        }

        if !self.recognizer.is_available() {
            return Err(RecognitionError::new(
                SpeechErrorCode::ServiceNotAllowed,
                "Speech recognizer is not available.",
            ));
        }

        Ok(())
    }

    async fn start_capture(
        &self,
        options: &RecognitionOptions,
        request: &mut RecognitionRequest,
    ) -> Result<(AudioCaptureSource, Option<String>), CaptureError> {
        let backend = self
            .collaborators
            .backends
            .create(self.settings.backend.clone())
            .map_err(CaptureError::Engine)?;

        let writer = options.persisted_recording().map(|recording| {
            AudioFileWriter::new(recording.output_path.clone(), &self.settings.recordings_dir)
                .with_fallback_sample_rate(recording.sample_rate.unwrap_or(self.settings.backend.target_sample_rate))
        });
        let uri = writer.as_ref().map(|w| w.path().display().to_string());

        let mut capture = AudioCaptureSource::new(backend, Arc::clone(&self.collaborators.audio_session));
        match capture.start(request, writer).await {
            Ok(()) => Ok((capture, uri)),
            Err(e) => {
                // The engine may be half-started
                capture.stop().await;
                Err(e)
            }
        }
    }

    async fn fail(&self, epoch: u64, error: RecognitionError) {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            return;
        }
        warn!("Recognition session {} failed: {}", epoch, error);
        if let Some(session) = inner.session.as_ref() {
            session.emit(RecognitionEvent::Error(error));
        }
        Self::reset_locked(&mut inner).await;
    }

    /// Funnel recognizer callbacks and silence timer fires into the lock
    async fn drive(
        self,
        epoch: u64,
        mut callbacks: mpsc::UnboundedReceiver<RecognizerCallback>,
        mut fired: mpsc::UnboundedReceiver<u64>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                callback = callbacks.recv() => {
                    let mut inner = self.inner.lock().await;
                    if inner.epoch != epoch {
                        debug!("Dropping callback for finished session {}", epoch);
                        break;
                    }
                    match callback {
                        Some(callback) => Self::handle_callback(&mut inner, callback).await,
                        None => {
                            info!("Recognition task for session {} completed", epoch);
                            Self::reset_locked(&mut inner).await;
                            break;
                        }
                    }
                }

                Some(generation) = fired.recv() => {
                    let mut inner = self.inner.lock().await;
                    if inner.epoch != epoch {
                        break;
                    }
                    let accepted = inner
                        .session
                        .as_mut()
                        .and_then(|session| session.watchdog.as_mut())
                        .map(|watchdog| watchdog.accept_fire(generation))
                        .unwrap_or(false);
                    if accepted {
                        info!("No speech for {:?}, ending session {}", self.settings.silence_timeout, epoch);
                        Self::reset_locked(&mut inner).await;
                    }
                }
            }
        }
    }

    async fn handle_callback(inner: &mut Inner, callback: RecognizerCallback) {
        let Some(session) = inner.session.as_mut() else {
            return;
        };

        let terminal = match callback {
            Err(native) => {
                match classify(&native) {
                    Some(error) => {
                        warn!("Recognition error: {} ({})", error, native);
                        session.emit(RecognitionEvent::Error(error));
                    }
                    None => debug!("Recognition request canceled"),
                }
                true
            }
            Ok(result) => {
                if !session.speech_started {
                    session.speech_started = true;
                    session.emit(RecognitionEvent::SpeechStart);
                }

                session.emit(translate_result(&result));

                if !result.is_final {
                    if let Some(watchdog) = session.watchdog.as_mut() {
                        watchdog.arm();
                    }
                }
                result.is_final
            }
        };

        if terminal {
            Self::reset_locked(inner).await;
        }
    }

    /// Single teardown path for every way a session ends
    ///
    /// Only the first call per session does anything; later calls find no
    /// session.
    async fn reset_locked(inner: &mut Inner) {
        let Some(mut session) = inner.session.take() else {
            return;
        };
        inner.epoch += 1;

        if let Some(mut task) = session.task.take() {
            if task.state() != TaskState::Completed {
                task.cancel();
            }
        }

        if let Some(mut capture) = session.capture.take() {
            session.writer = capture.stop().await;
        }

        let mut recording_uri = None;
        if let Some(writer) = session.writer.take() {
            match writer.finish() {
                Ok(path) => {
                    recording_uri = Some(path.display().to_string());
                    // Runs outside the session lock
                    if let Some(hook) = session.recording_hook.take() {
                        tokio::task::spawn_blocking(move || hook(path));
                    }
                }
                Err(e) => error!("Failed to close recording: {:#}", e),
            }
        }

        session.request = None;
        session.watchdog = None;
        session.recording_hook = None;

        if session.live {
            session.emit(RecognitionEvent::AudioEnd { uri: recording_uri });
        }
        session.emit(RecognitionEvent::End);

        info!(
            "Recognition session reset (speech detected: {}, file source: {})",
            session.speech_started,
            session.options.is_file_source()
        );
    }
}
