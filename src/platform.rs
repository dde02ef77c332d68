//! Platform collaborators consumed by the session controller

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Permission checks performed before a session starts
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn speech_recognition_granted(&self) -> bool;

    async fn microphone_granted(&self) -> bool;
}

/// Fixed permission answers
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions {
    pub speech_recognition: bool,
    pub microphone: bool,
}

impl StaticPermissions {
    pub fn granted() -> Self {
        Self {
            speech_recognition: true,
            microphone: true,
        }
    }
}

#[async_trait]
impl PermissionChecker for StaticPermissions {
    async fn speech_recognition_granted(&self) -> bool {
        self.speech_recognition
    }

    async fn microphone_granted(&self) -> bool {
        self.microphone
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSessionCategory {
    Record,
    PlayAndRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSessionMode {
    Measurement,
    Default,
}

/// Audio routing applied before capture begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSessionConfig {
    pub category: AudioSessionCategory,
    pub mode: AudioSessionMode,
    pub duck_others: bool,
}

impl AudioSessionConfig {
    /// Settings for capturing speech
    pub fn record_speech() -> Self {
        Self {
            category: AudioSessionCategory::PlayAndRecord,
            mode: AudioSessionMode::Measurement,
            duck_others: true,
        }
    }
}

pub trait AudioSessionConfigurator: Send + Sync {
    fn apply(&self, config: &AudioSessionConfig) -> Result<()>;
}

/// Configurator for platforms without an audio session
pub struct NoopAudioSession;

impl AudioSessionConfigurator for NoopAudioSession {
    fn apply(&self, config: &AudioSessionConfig) -> Result<()> {
        debug!("No audio session to configure ({:?})", config);
        Ok(())
    }
}
