// Unit tests for the realtime wire message formats

use base64::Engine;
use voice_live::live::{RealtimeInput, ServerMessage};

#[test]
fn test_pcm_audio_payload_shape() {
    let input = RealtimeInput::pcm_audio(&[0x01, 0x02, 0x03, 0x04], 16000);
    let json = serde_json::to_value(&input).unwrap();

    assert_eq!(json["media"]["mimeType"], "audio/pcm;rate=16000");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(json["media"]["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, vec![0x01, 0x02, 0x03, 0x04]);
}

#[test]
fn test_setup_complete_frame_parses() {
    let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete":{}}"#).unwrap();
    assert!(msg.setup_complete.is_some());
    assert!(msg.server_content.is_none());
}

#[test]
fn test_transcription_fields_parse() {
    let msg: ServerMessage = serde_json::from_str(
        r#"{"serverContent":{
            "inputTranscription":{"text":"hello"},
            "outputTranscription":{"text":"hi there"},
            "turnComplete":true
        }}"#,
    )
    .unwrap();

    let content = msg.server_content.unwrap();
    assert_eq!(content.input_transcription.unwrap().text, "hello");
    assert_eq!(content.output_transcription.unwrap().text, "hi there");
    assert!(content.turn_complete);
    assert!(!content.interrupted);
}

#[test]
fn test_inline_audio_extraction() {
    let msg: ServerMessage = serde_json::from_str(
        r#"{"serverContent":{"modelTurn":{"parts":[
            {"inlineData":{"data":"AAEC","mimeType":"audio/pcm;rate=24000"}}
        ]}}}"#,
    )
    .unwrap();

    let content = msg.server_content.unwrap();
    assert_eq!(content.inline_audio(), Some("AAEC"));
}

#[test]
fn test_inline_audio_absent_when_no_parts() {
    let msg: ServerMessage =
        serde_json::from_str(r#"{"serverContent":{"modelTurn":{"parts":[]}}}"#).unwrap();
    assert_eq!(msg.server_content.unwrap().inline_audio(), None);
}

#[test]
fn test_interrupted_frame_parses() {
    let msg: ServerMessage =
        serde_json::from_str(r#"{"serverContent":{"interrupted":true}}"#).unwrap();
    assert!(msg.server_content.unwrap().interrupted);
}

#[test]
fn test_unknown_fields_are_tolerated() {
    let msg: ServerMessage = serde_json::from_str(
        r#"{"serverContent":{"turnComplete":false,"usageMetadata":{"tokens":12}},"extra":1}"#,
    )
    .unwrap();
    assert!(msg.server_content.is_some());
}
