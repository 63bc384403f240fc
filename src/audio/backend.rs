use anyhow::Result;
use tokio::sync::mpsc;

use super::pcm;
use super::volume::AnalysisTap;

/// Direction of an audio chunk relative to the service channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkDirection {
    /// Synthesized speech arriving from the service
    Inbound,
    /// Captured microphone audio headed to the service
    Outbound,
}

/// Raw PCM16 payload plus the format it was packed with
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// PCM16 little-endian bytes
    pub data: Vec<u8>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Which side of the channel produced this chunk
    pub direction: ChunkDirection,
}

impl AudioChunk {
    pub fn inbound(data: Vec<u8>, sample_rate: u32, channels: u16) -> Self {
        Self {
            data,
            sample_rate,
            channels,
            direction: ChunkDirection::Inbound,
        }
    }

    pub fn outbound(data: Vec<u8>, sample_rate: u32, channels: u16) -> Self {
        Self {
            data,
            sample_rate,
            channels,
            direction: ChunkDirection::Outbound,
        }
    }

    /// Playback duration of the payload, assuming well-formed PCM16
    pub fn duration(&self) -> std::time::Duration {
        pcm::duration_of(self.data.len() / 2 / self.channels as usize, self.sample_rate)
    }
}

/// One captured frame of microphone audio (f32 mono samples)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Mono samples in [-1.0, 1.0] (nominally; capture does not clamp)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for the capture backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Capture sample rate (the wire format expects 16kHz)
    pub sample_rate: u32,
    /// Channel count (1 = mono)
    pub channels: u16,
    /// Samples per delivered frame
    pub frame_samples: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz for the realtime wire format
            channels: 1,        // Mono
            frame_samples: 4096,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - `CpalBackend`: cross-platform microphone capture via cpal
/// - Mock backends in tests drive frames by hand
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Whether the runtime environment permits microphone capture at all.
    ///
    /// Checked before any device is touched; a `false` here is a policy
    /// failure, not a runtime error.
    fn capture_permitted(&self) -> bool;

    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive fixed-size frames.
    /// The receiver closes when the stream is stopped.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio. Releasing an already-stopped backend is a no-op.
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Shared window over the most recent input samples, for volume analysis
    fn analysis_tap(&self) -> AnalysisTap;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
