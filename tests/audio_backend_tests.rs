// Unit tests for the audio backend data types

use std::time::Duration;
use voice_live::audio::backend::{AudioChunk, AudioFrame, ChunkDirection};
use voice_live::audio::pcm::encode_pcm16;

#[test]
fn test_outbound_chunk_direction() {
    let chunk = AudioChunk::outbound(encode_pcm16(&[0.0; 4096]), 16000, 1);

    assert_eq!(chunk.direction, ChunkDirection::Outbound);
    assert_eq!(chunk.sample_rate, 16000);
    assert_eq!(chunk.data.len(), 8192, "4096 samples become 8192 PCM16 bytes");
}

#[test]
fn test_inbound_chunk_direction() {
    let chunk = AudioChunk::inbound(vec![0u8; 48000], 24000, 1);

    assert_eq!(chunk.direction, ChunkDirection::Inbound);
    assert_eq!(chunk.sample_rate, 24000);
}

#[test]
fn test_chunk_duration() {
    let outbound = AudioChunk::outbound(vec![0u8; 8192], 16000, 1);
    assert_eq!(outbound.duration(), Duration::from_micros(256000));

    let inbound = AudioChunk::inbound(vec![0u8; 48000], 24000, 1);
    assert_eq!(inbound.duration(), Duration::from_secs(1));
}

#[test]
fn test_audio_frame_fields() {
    let frame = AudioFrame {
        samples: vec![0.5; 4096],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 256,
    };

    assert_eq!(frame.samples.len(), 4096);
    assert_eq!(frame.sample_rate, 16000);
    assert_eq!(frame.channels, 1);
    assert_eq!(frame.timestamp_ms, 256);
}
