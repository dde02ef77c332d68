use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{RecognitionError, SpeechErrorCode};
use crate::locale::resolve_locale;
use crate::recognizer::RecognizerProvider;
use crate::session::{
    Collaborators, ControllerSettings, EventSink, RecognitionEvent, RecognitionOptions, RecordingHook,
    SessionController, SessionState,
};

/// Control surface over the single active recognition session
///
/// Keeps one `SessionController` per locale: starting with a different
/// locale fully resets the current controller before replacing it.
pub struct SpeechRecognitionService {
    provider: Arc<dyn RecognizerProvider>,
    collaborators: Collaborators,
    settings: ControllerSettings,
    active: Mutex<Option<SessionController>>,
}

impl SpeechRecognitionService {
    pub fn new(provider: Arc<dyn RecognizerProvider>, collaborators: Collaborators, settings: ControllerSettings) -> Self {
        Self {
            provider,
            collaborators,
            settings,
            active: Mutex::new(None),
        }
    }

    pub async fn start(&self, options: RecognitionOptions, sink: Arc<dyn EventSink>, recording_hook: Option<RecordingHook>) {
        let supported = self.provider.supported_locales();
        let Some(locale) = resolve_locale(&options.lang, &supported).map(str::to_string) else {
            warn!("Locale {} is not supported", options.lang);
            self.reset().await;
            Self::reject(
                sink.as_ref(),
                RecognitionError::new(
                    SpeechErrorCode::LanguageNotSupported,
                    format!("Locale {} is not supported by the speech recognizer.", options.lang),
                ),
            );
            return;
        };

        let controller = {
            let mut active = self.active.lock().await;
            match active.as_ref().filter(|c| c.locale() == locale) {
                Some(controller) => controller.clone(),
                None => {
                    if let Some(previous) = active.take() {
                        info!("Switching recognizer locale {} -> {}", previous.locale(), locale);
                        previous.reset().await;
                    }

                    let Some(recognizer) = self.provider.recognizer_for(&locale) else {
                        Self::reject(
                            sink.as_ref(),
                            RecognitionError::new(
                                SpeechErrorCode::ServiceNotAllowed,
                                format!("No speech recognizer available for {}.", locale),
                            ),
                        );
                        return;
                    };

                    let controller = SessionController::new(
                        locale.clone(),
                        recognizer,
                        self.collaborators.clone(),
                        self.settings.clone(),
                    );
                    *active = Some(controller.clone());
                    controller
                }
            }
        };

        controller.start(options, sink, recording_hook).await;
    }

    pub async fn stop(&self) {
        if let Some(controller) = self.current().await {
            controller.stop().await;
        }
    }

    pub async fn abort(&self) {
        if let Some(controller) = self.current().await {
            controller.abort().await;
        }
    }

    pub async fn get_state(&self) -> SessionState {
        match self.current().await {
            Some(controller) => controller.get_state().await,
            None => SessionState::Inactive,
        }
    }

    /// Locale of the current controller, if one exists
    pub async fn locale(&self) -> Option<String> {
        self.current().await.map(|c| c.locale().to_string())
    }

    async fn reset(&self) {
        if let Some(controller) = self.current().await {
            controller.reset().await;
        }
    }

    async fn current(&self) -> Option<SessionController> {
        self.active.lock().await.clone()
    }

    /// Report a start that never produced a session
    fn reject(sink: &dyn EventSink, error: RecognitionError) {
        sink.emit(RecognitionEvent::Error(error));
        sink.emit(RecognitionEvent::End);
    }
}
