// Shared fakes for session tests
//
// ManualRecognizer hands its callback sender to the test so callbacks can be
// injected at will; MemoryBackend lets the test push captured frames.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use speech_session::{
    AudioBackend, AudioBackendConfig, AudioFrame, BackendFactory, ChannelSink, Collaborators, ControllerSettings,
    NativeError, NativeResult, NativeSegment, NativeTranscription, NoopAudioSession, PermissionChecker, RecognitionEvent,
    RecognitionRequest, RecognitionTask, RecognizerCallback, RecognizerCapabilities, SessionController,
    SpeechRecognizer, StaticPermissions, TaskState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Recognizer
// ============================================================================

#[derive(Default)]
pub struct RecognizerControl {
    pub callbacks: Mutex<Option<mpsc::UnboundedSender<RecognizerCallback>>>,
    pub audio: Mutex<Option<mpsc::Receiver<AudioFrame>>>,
    pub task_state: Mutex<Option<Arc<Mutex<TaskState>>>>,
    pub tasks_started: AtomicUsize,
    pub finish_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub partial_results_requested: Mutex<Option<bool>>,
    pub file_uri: Mutex<Option<String>>,
}

impl RecognizerControl {
    /// Deliver a callback as the platform would
    pub fn send(&self, callback: RecognizerCallback) {
        let callbacks = self.callbacks.lock().unwrap();
        if let Some(tx) = callbacks.as_ref() {
            let _ = tx.send(callback);
        }
    }

    /// Drop the callback sender, as a task that completes silently does
    pub fn complete(&self) {
        self.callbacks.lock().unwrap().take();
        if let Some(state) = self.task_state.lock().unwrap().as_ref() {
            *state.lock().unwrap() = TaskState::Completed;
        }
    }

    pub fn set_task_state(&self, value: TaskState) {
        if let Some(state) = self.task_state.lock().unwrap().as_ref() {
            *state.lock().unwrap() = value;
        }
    }

    pub fn finish_calls(&self) -> usize {
        self.finish_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn tasks_started(&self) -> usize {
        self.tasks_started.load(Ordering::SeqCst)
    }
}

pub struct ManualRecognizer {
    pub locale: String,
    pub available: bool,
    pub capabilities: RecognizerCapabilities,
    pub start_error: Option<NativeError>,
    pub control: Arc<RecognizerControl>,
}

impl ManualRecognizer {
    pub fn new(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
            available: true,
            capabilities: RecognizerCapabilities::default(),
            start_error: None,
            control: Arc::new(RecognizerControl::default()),
        }
    }
}

struct ManualTask {
    state: Arc<Mutex<TaskState>>,
    control: Arc<RecognizerControl>,
}

impl RecognitionTask for ManualTask {
    fn state(&self) -> TaskState {
        *self.state.lock().unwrap()
    }

    fn finish(&mut self) {
        self.control.finish_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = TaskState::Finishing;
    }

    fn cancel(&mut self) {
        self.control.cancel_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = TaskState::Canceling;
    }
}

#[async_trait]
impl SpeechRecognizer for ManualRecognizer {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn capabilities(&self) -> RecognizerCapabilities {
        self.capabilities
    }

    async fn start_task(
        &self,
        request: &mut RecognitionRequest,
        callbacks: mpsc::UnboundedSender<RecognizerCallback>,
    ) -> Result<Box<dyn RecognitionTask>, NativeError> {
        if let Some(error) = &self.start_error {
            return Err(error.clone());
        }

        self.control.tasks_started.fetch_add(1, Ordering::SeqCst);
        *self.control.partial_results_requested.lock().unwrap() = Some(request.should_report_partial_results);
        *self.control.file_uri.lock().unwrap() = request.file_uri().map(str::to_string);
        *self.control.audio.lock().unwrap() = request.take_audio_receiver();
        *self.control.callbacks.lock().unwrap() = Some(callbacks);

        let state = Arc::new(Mutex::new(TaskState::Running));
        *self.control.task_state.lock().unwrap() = Some(Arc::clone(&state));

        Ok(Box::new(ManualTask {
            state,
            control: Arc::clone(&self.control),
        }))
    }
}

// ============================================================================
// Audio input
// ============================================================================

#[derive(Default)]
pub struct BackendControl {
    pub frames: Mutex<Option<mpsc::Sender<AudioFrame>>>,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl BackendControl {
    pub async fn push(&self, frame: AudioFrame) {
        let tx = self.frames.lock().unwrap().clone();
        if let Some(tx) = tx {
            tx.send(frame).await.expect("tap should be listening");
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub struct MemoryBackend {
    control: Arc<BackendControl>,
    fail_start: bool,
    capturing: bool,
}

#[async_trait]
impl AudioBackend for MemoryBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.fail_start {
            bail!("input device unavailable");
        }
        let (tx, rx) = mpsc::channel(64);
        *self.control.frames.lock().unwrap() = Some(tx);
        self.control.starts.fetch_add(1, Ordering::SeqCst);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }
        self.control.frames.lock().unwrap().take();
        self.control.stops.fetch_add(1, Ordering::SeqCst);
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "memory"
    }
}

pub struct MemoryBackendFactory {
    pub control: Arc<BackendControl>,
    pub fail_start: bool,
}

impl MemoryBackendFactory {
    pub fn new() -> Self {
        Self {
            control: Arc::new(BackendControl::default()),
            fail_start: false,
        }
    }
}

impl BackendFactory for MemoryBackendFactory {
    fn create(&self, _config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        Ok(Box::new(MemoryBackend {
            control: Arc::clone(&self.control),
            fail_start: self.fail_start,
            capturing: false,
        }))
    }
}

pub fn frame(value: i16, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![value; 160],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: SessionController,
    pub recognizer: Arc<RecognizerControl>,
    pub backend: Arc<BackendControl>,
}

pub fn settings(silence_timeout: Duration) -> ControllerSettings {
    ControllerSettings {
        silence_timeout,
        ..ControllerSettings::default()
    }
}

pub fn collaborators(permissions: StaticPermissions, backends: Arc<MemoryBackendFactory>) -> Collaborators {
    Collaborators {
        permissions: Arc::new(permissions),
        audio_session: Arc::new(NoopAudioSession),
        backends,
    }
}

pub fn harness_with(
    recognizer: ManualRecognizer,
    permissions: StaticPermissions,
    backends: MemoryBackendFactory,
    settings: ControllerSettings,
) -> Harness {
    build_harness(recognizer, Arc::new(permissions), backends, settings)
}

fn build_harness(
    recognizer: ManualRecognizer,
    permissions: Arc<dyn PermissionChecker>,
    backends: MemoryBackendFactory,
    settings: ControllerSettings,
) -> Harness {
    let control = Arc::clone(&recognizer.control);
    let backends = Arc::new(backends);
    let backend = Arc::clone(&backends.control);
    let controller = SessionController::new(
        recognizer.locale.clone(),
        Arc::new(recognizer),
        Collaborators {
            permissions,
            audio_session: Arc::new(NoopAudioSession),
            backends,
        },
        settings,
    );

    Harness {
        controller,
        recognizer: control,
        backend,
    }
}

/// Permissions that answer only once the test opens the gate
#[derive(Default)]
pub struct GatedPermissions {
    pub gate: Notify,
}

#[async_trait]
impl PermissionChecker for GatedPermissions {
    async fn speech_recognition_granted(&self) -> bool {
        self.gate.notified().await;
        true
    }

    async fn microphone_granted(&self) -> bool {
        true
    }
}

pub fn gated_harness() -> (Harness, Arc<GatedPermissions>) {
    let permissions = Arc::new(GatedPermissions::default());
    let harness = build_harness(
        ManualRecognizer::new("en-US"),
        Arc::clone(&permissions) as Arc<dyn PermissionChecker>,
        MemoryBackendFactory::new(),
        settings(Duration::from_secs(3)),
    );
    (harness, permissions)
}

pub fn harness() -> Harness {
    harness_with(
        ManualRecognizer::new("en-US"),
        StaticPermissions::granted(),
        MemoryBackendFactory::new(),
        settings(Duration::from_secs(3)),
    )
}

pub fn event_channel() -> (Arc<ChannelSink>, mpsc::UnboundedReceiver<RecognitionEvent>) {
    ChannelSink::new()
}

pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<RecognitionEvent>) -> RecognitionEvent {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Every remaining event, until the sink is released
pub async fn drain(rx: &mut mpsc::UnboundedReceiver<RecognitionEvent>) -> Vec<RecognitionEvent> {
    let mut events = Vec::new();
    loop {
        match tokio::time::timeout(EVENT_TIMEOUT, rx.recv()).await {
            Ok(Some(event)) => events.push(event),
            Ok(None) => return events,
            Err(_) => panic!("sink was never released; events so far: {:?}", events),
        }
    }
}

pub async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<RecognitionEvent>, window: Duration) {
    if let Ok(event) = tokio::time::timeout(window, rx.recv()).await {
        panic!("expected no event, got {:?}", event);
    }
}

pub fn count_end(events: &[RecognitionEvent]) -> usize {
    events.iter().filter(|e| **e == RecognitionEvent::End).count()
}

// ============================================================================
// Native payloads
// ============================================================================

pub fn native(text: &str, is_final: bool, segments: &[(f64, f64, f32)]) -> RecognizerCallback {
    Ok(NativeResult {
        is_final,
        transcriptions: vec![NativeTranscription {
            formatted_string: text.to_string(),
            segments: segments
                .iter()
                .map(|&(timestamp, duration, confidence)| NativeSegment {
                    substring: text.to_string(),
                    timestamp,
                    duration,
                    confidence,
                })
                .collect(),
        }],
    })
}

pub fn native_error(code: i64, message: &str) -> RecognizerCallback {
    Err(NativeError::new(code, message))
}
