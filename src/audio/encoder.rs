//! Capture encoding task
//!
//! Drains fixed-size capture frames, converts them to the outbound wire
//! format and hands them to the service channel. Sends are fire-and-forget:
//! a failed send is logged and the frame dropped, capture continues. The task
//! ends when the frame channel closes, which happens exactly when the session
//! controller releases the input stream.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::backend::{AudioChunk, AudioFrame};
use super::pcm;
use crate::live::{LiveChannel, RealtimeInput};

pub async fn run_encoder(mut frames: mpsc::Receiver<AudioFrame>, channel: Arc<dyn LiveChannel>) {
    let mut sent = 0u64;
    while let Some(frame) = frames.recv().await {
        let chunk = AudioChunk::outbound(
            pcm::encode_pcm16(&frame.samples),
            frame.sample_rate,
            frame.channels,
        );
        let input = RealtimeInput::pcm_audio(&chunk.data, chunk.sample_rate);
        match channel.send_realtime_input(input).await {
            Ok(()) => sent += 1,
            Err(e) => warn!("failed to send audio frame, dropping it: {}", e),
        }
    }
    debug!("capture encoder finished after {} frames", sent);
}
