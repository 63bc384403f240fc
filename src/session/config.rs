use serde::{Deserialize, Serialize};

use crate::live::LiveConfig;

/// Configuration for one voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Model id passed to the connector
    pub model: String,

    /// Credential for the service; empty is a configuration failure
    pub api_key: String,

    /// Capture sample rate (the wire format expects 16kHz)
    pub capture_sample_rate: u32,

    /// Inbound synthesized-speech sample rate (24kHz)
    pub playback_sample_rate: u32,

    /// Samples per captured frame
    pub frame_samples: usize,

    /// Connect-time service configuration, forwarded verbatim
    pub live: LiveConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            model: "gemini-2.5-flash-native-audio-preview-12-2025".to_string(),
            api_key: String::new(),
            capture_sample_rate: 16000,
            playback_sample_rate: 24000,
            frame_samples: 4096,
            live: LiveConfig::default(),
        }
    }
}
