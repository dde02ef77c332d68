use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::AudioBackendConfig;
use crate::session::ControllerSettings;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub recognition: RecognitionConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionConfig {
    pub default_locale: String,
    #[serde(default = "default_silence_timeout_ms")]
    pub silence_timeout_ms: u64,
    /// Locales the replay recognizer advertises
    #[serde(default)]
    pub supported_locales: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Directory for recordings without an explicit output path
    pub recordings_path: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    #[serde(default = "default_tap_buffer_size")]
    pub tap_buffer_size: usize,
}

fn default_silence_timeout_ms() -> u64 {
    3000
}

fn default_tap_buffer_size() -> usize {
    1024
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        let defaults = ControllerSettings::default();

        ControllerSettings {
            silence_timeout: Duration::from_millis(self.recognition.silence_timeout_ms),
            backend: AudioBackendConfig {
                target_sample_rate: self.audio.sample_rate,
                target_channels: self.audio.channels,
                buffer_size: self.audio.tap_buffer_size,
            },
            recordings_dir: self
                .audio
                .recordings_path
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or(defaults.recordings_dir),
        }
    }
}
