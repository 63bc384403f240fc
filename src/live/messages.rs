use base64::Engine;
use serde::{Deserialize, Serialize};

/// Outbound realtime payload: `{"media": {"data": ..., "mimeType": ...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeInput {
    pub media: MediaBlob,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    /// Base64-encoded bytes
    pub data: String,
    pub mime_type: String,
}

impl RealtimeInput {
    /// Wrap PCM16 bytes for the wire (`audio/pcm;rate=<hz>`).
    pub fn pcm_audio(pcm_bytes: &[u8], sample_rate: u32) -> Self {
        Self {
            media: MediaBlob {
                data: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
                mime_type: format!("audio/pcm;rate={}", sample_rate),
            },
        }
    }
}

/// One inbound frame from the service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    /// Present on the handshake acknowledgement frame
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

/// The interesting part of an inbound frame; any combination of fields may
/// appear in a single message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    /// Partial transcription of the user's speech
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    /// Partial transcription of the model's speech
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
    /// The current turn is finished
    #[serde(default)]
    pub turn_complete: bool,
    /// The user barged in; playing audio must stop
    #[serde(default)]
    pub interrupted: bool,
    /// Synthesized speech chunks
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub inline_data: Option<InlineBlob>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineBlob {
    /// Base64-encoded PCM16 at 24kHz mono
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl ServerContent {
    /// Base64 audio payload of the first model-turn part, if any.
    pub fn inline_audio(&self) -> Option<&str> {
        self.model_turn
            .as_ref()?
            .parts
            .first()?
            .inline_data
            .as_ref()
            .map(|blob| blob.data.as_str())
    }
}

/// Connect-time configuration forwarded to the service verbatim.
///
/// None of these fields are interpreted by the engine; the persona string in
/// particular is an opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Response modalities, e.g. `["AUDIO"]`
    pub response_modalities: Vec<String>,
    /// Request live transcription of the user's speech
    pub transcribe_input: bool,
    /// Request live transcription of the model's speech
    pub transcribe_output: bool,
    /// Prebuilt voice selector
    pub voice: String,
    /// Opaque persona / system instruction text
    pub system_instruction: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            response_modalities: vec!["AUDIO".to_string()],
            transcribe_input: true,
            transcribe_output: true,
            voice: "Kore".to_string(),
            system_instruction: String::new(),
        }
    }
}
