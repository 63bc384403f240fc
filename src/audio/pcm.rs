//! PCM16 wire-format conversions.

use anyhow::{bail, Result};
use std::time::Duration;

/// Convert captured f32 mono samples into PCM16 little-endian bytes.
///
/// Linear scaling with truncation and no clamping: samples at or beyond full
/// scale wrap around. Known risk carried over from the wire producer's
/// conversion; callers upstream are expected to deliver nominal [-1, 1] audio.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s * 32768.0) as i32 as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Decode PCM16 little-endian bytes into i16 samples.
pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<i16>> {
    if bytes.len() % 2 != 0 {
        bail!("PCM16 payload has odd length {}", bytes.len());
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// Playback duration of `sample_count` mono samples at `sample_rate`.
pub fn duration_of(sample_count: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(sample_count as f64 / sample_rate as f64)
}
