//! Scripted recognizer
//!
//! Plays back a JSON script of timed callbacks, draining any streamed audio
//! while it runs. Useful for exercising the session lifecycle without a
//! platform recognizer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{
    NativeError, NativeResult, RecognitionRequest, RecognitionTask, RecognizerCallback, RecognizerCapabilities,
    RecognizerProvider, SpeechRecognizer, TaskState, REQUEST_CANCELED_CODE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScriptedCallback {
    Result(NativeResult),
    Error(NativeError),
}

impl ScriptedCallback {
    fn is_terminal(&self) -> bool {
        match self {
            ScriptedCallback::Result(result) => result.is_final,
            ScriptedCallback::Error(_) => true,
        }
    }

    fn into_callback(self) -> RecognizerCallback {
        match self {
            ScriptedCallback::Result(result) => Ok(result),
            ScriptedCallback::Error(error) => Err(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    /// Delay after the previous step
    pub delay_ms: u64,
    pub callback: ScriptedCallback,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    pub steps: Vec<ScriptStep>,
    /// Delivered when the task is asked to finish
    #[serde(default)]
    pub on_finish: Option<ScriptedCallback>,
    /// Complete the task once the steps run out instead of waiting for finish
    #[serde(default)]
    pub complete_after_steps: bool,
    #[serde(default)]
    pub supports_on_device_recognition: bool,
    #[serde(default)]
    pub supports_punctuation: bool,
}

impl ReplayScript {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay script: {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid replay script: {}", path.display()))
    }
}

pub struct ReplayRecognizer {
    locale: String,
    script: ReplayScript,
}

impl ReplayRecognizer {
    pub fn new(locale: impl Into<String>, script: ReplayScript) -> Self {
        Self {
            locale: locale.into(),
            script,
        }
    }
}

enum Control {
    Finish,
    Cancel,
}

struct ReplayTask {
    state: Arc<Mutex<TaskState>>,
    control: mpsc::UnboundedSender<Control>,
}

impl ReplayTask {
    fn transition(&self, from: TaskState, to: TaskState) {
        if let Ok(mut state) = self.state.lock() {
            if *state == from {
                *state = to;
            }
        }
    }
}

impl RecognitionTask for ReplayTask {
    fn state(&self) -> TaskState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(TaskState::Completed)
    }

    fn finish(&mut self) {
        self.transition(TaskState::Running, TaskState::Finishing);
        let _ = self.control.send(Control::Finish);
    }

    fn cancel(&mut self) {
        self.transition(TaskState::Running, TaskState::Canceling);
        self.transition(TaskState::Finishing, TaskState::Canceling);
        let _ = self.control.send(Control::Cancel);
    }
}

fn set_state(state: &Mutex<TaskState>, value: TaskState) {
    if let Ok(mut state) = state.lock() {
        *state = value;
    }
}

#[async_trait]
impl SpeechRecognizer for ReplayRecognizer {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn is_available(&self) -> bool {
        true
    }

    fn capabilities(&self) -> RecognizerCapabilities {
        RecognizerCapabilities {
            supports_on_device_recognition: self.script.supports_on_device_recognition,
            supports_punctuation: self.script.supports_punctuation,
        }
    }

    async fn start_task(
        &self,
        request: &mut RecognitionRequest,
        callbacks: mpsc::UnboundedSender<RecognizerCallback>,
    ) -> Result<Box<dyn RecognitionTask>, NativeError> {
        if let Some(mut audio) = request.take_audio_receiver() {
            tokio::spawn(async move {
                let mut frames = 0usize;
                while audio.recv().await.is_some() {
                    frames += 1;
                }
                debug!("Replay recognizer consumed {} audio frames", frames);
            });
        } else if let Some(uri) = request.file_uri() {
            info!("Replay recognizer transcribing {}", uri);
        }

        let state = Arc::new(Mutex::new(TaskState::Running));
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_script(self.script.clone(), callbacks, control_rx, Arc::clone(&state)));

        Ok(Box::new(ReplayTask {
            state,
            control: control_tx,
        }))
    }
}

async fn run_script(
    script: ReplayScript,
    callbacks: mpsc::UnboundedSender<RecognizerCallback>,
    mut control: mpsc::UnboundedReceiver<Control>,
    state: Arc<Mutex<TaskState>>,
) {
    let canceled = || Err(NativeError::new(REQUEST_CANCELED_CODE, "Request was canceled"));

    for step in script.steps {
        tokio::select! {
            command = control.recv() => {
                match command {
                    Some(Control::Finish) => {
                        if let Some(on_finish) = script.on_finish {
                            let _ = callbacks.send(on_finish.into_callback());
                        }
                    }
                    Some(Control::Cancel) | None => {
                        let _ = callbacks.send(canceled());
                    }
                }
                set_state(&state, TaskState::Completed);
                return;
            }

            _ = tokio::time::sleep(Duration::from_millis(step.delay_ms)) => {
                let terminal = step.callback.is_terminal();
                let _ = callbacks.send(step.callback.into_callback());
                if terminal {
                    set_state(&state, TaskState::Completed);
                    return;
                }
            }
        }
    }

    if !script.complete_after_steps {
        match control.recv().await {
            Some(Control::Finish) => {
                if let Some(on_finish) = script.on_finish {
                    let _ = callbacks.send(on_finish.into_callback());
                }
            }
            Some(Control::Cancel) | None => {
                let _ = callbacks.send(canceled());
            }
        }
    }

    set_state(&state, TaskState::Completed);
}

/// Provider handing out replay recognizers for a fixed locale set
pub struct ReplayProvider {
    locales: Vec<String>,
    script: ReplayScript,
}

impl ReplayProvider {
    pub fn new(locales: Vec<String>, script: ReplayScript) -> Self {
        Self { locales, script }
    }
}

impl RecognizerProvider for ReplayProvider {
    fn supported_locales(&self) -> Vec<String> {
        self.locales.clone()
    }

    fn recognizer_for(&self, locale: &str) -> Option<Arc<dyn SpeechRecognizer>> {
        if !self.locales.iter().any(|l| l == locale) {
            return None;
        }
        Some(Arc::new(ReplayRecognizer::new(locale, self.script.clone())))
    }
}
