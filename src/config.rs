use anyhow::Result;
use serde::Deserialize;

use crate::live::LiveConfig;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub live: LiveSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub model: String,
    /// Read from config, with GEMINI_API_KEY as fallback
    pub api_key: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-native-audio-preview-12-2025".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub capture_sample_rate: u32,
    pub playback_sample_rate: u32,
    pub frame_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_sample_rate: 16000,
            playback_sample_rate: 24000,
            frame_samples: 4096,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    pub voice: String,
    pub system_instruction: String,
    pub transcribe_input: bool,
    pub transcribe_output: bool,
}

impl Default for LiveSettings {
    fn default() -> Self {
        let live = LiveConfig::default();
        Self {
            voice: live.voice,
            system_instruction: live.system_instruction,
            transcribe_input: live.transcribe_input,
            transcribe_output: live.transcribe_output,
        }
    }
}

impl Config {
    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Build the per-session configuration, resolving the API key from the
    /// GEMINI_API_KEY environment variable when the file leaves it empty.
    pub fn session_config(&self) -> SessionConfig {
        let api_key = if self.service.api_key.is_empty() {
            std::env::var("GEMINI_API_KEY").unwrap_or_default()
        } else {
            self.service.api_key.clone()
        };

        SessionConfig {
            model: self.service.model.clone(),
            api_key,
            capture_sample_rate: self.audio.capture_sample_rate,
            playback_sample_rate: self.audio.playback_sample_rate,
            frame_samples: self.audio.frame_samples,
            live: LiveConfig {
                voice: self.live.voice.clone(),
                system_instruction: self.live.system_instruction.clone(),
                transcribe_input: self.live.transcribe_input,
                transcribe_output: self.live.transcribe_output,
                ..LiveConfig::default()
            },
            ..SessionConfig::default()
        }
    }
}
