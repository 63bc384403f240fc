//! cpal-backed microphone capture and speaker output.

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::volume::AnalysisTap;

/// Frames buffered between the capture callback and the encoder task before
/// new frames are dropped. The callback never blocks.
const FRAME_QUEUE_DEPTH: usize = 32;

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched through the owning backend/sink, which
/// serializes access behind a Mutex; stream methods never cross thread
/// boundaries unsafely.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone capture backend
///
/// Opens the default input device at 16kHz mono f32, accumulates callback
/// data into fixed-size frames and delivers them over a bounded channel.
/// Saturation drops the newest frame rather than blocking the callback.
pub struct CpalBackend {
    config: AudioBackendConfig,
    tap: AnalysisTap,
    stream: Arc<Mutex<Option<SendableStream>>>,
    capturing: bool,
}

impl CpalBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            tap: AnalysisTap::new(),
            stream: Arc::new(Mutex::new(None)),
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for CpalBackend {
    fn capture_permitted(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            bail!("Already capturing");
        }

        let device = cpal::default_host()
            .default_input_device()
            .context("No default input device available")?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        info!(
            "Opening microphone '{}' ({}Hz, {} channels, {} samples/frame)",
            name, self.config.sample_rate, self.config.channels, self.config.frame_samples
        );

        let stream_config = cpal::StreamConfig {
            channels: self.config.channels,
            sample_rate: cpal::SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let tap = self.tap.clone();
        let frame_samples = self.config.frame_samples.max(1);
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;
        let started = Instant::now();
        let mut pending: Vec<f32> = Vec::with_capacity(frame_samples);
        let mut dropped = 0u64;

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    tap.push(data);
                    pending.extend_from_slice(data);
                    while pending.len() >= frame_samples {
                        let samples: Vec<f32> = pending.drain(..frame_samples).collect();
                        let frame = AudioFrame {
                            samples,
                            sample_rate,
                            channels,
                            timestamp_ms: started.elapsed().as_millis() as u64,
                        };
                        if tx.try_send(frame).is_err() {
                            dropped += 1;
                            if dropped % 64 == 1 {
                                warn!("capture queue saturated, {} frames dropped", dropped);
                            }
                        }
                    }
                },
                |err| error!("input stream error: {}", err),
                None,
            )
            .context("Failed to open microphone stream")?;

        stream.play().context("Failed to start microphone stream")?;
        *self.stream.lock().unwrap() = Some(SendableStream(stream));
        self.capturing = true;

        info!("Microphone capture started");
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        // Dropping the stream also drops the callback's frame sender, which
        // closes the receiver and ends the encoder task.
        if let Some(stream) = self.stream.lock().unwrap().take() {
            if let Err(e) = stream.0.pause() {
                warn!("failed to pause microphone stream: {}", e);
            }
        }
        self.capturing = false;

        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn analysis_tap(&self) -> AnalysisTap {
        self.tap.clone()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

/// Speaker sink
///
/// Keeps an open output stream whose callback drains a shared sample queue.
/// `play` appends to the queue immediately; all timing is the scheduler's
/// responsibility. `stop` discards whatever has not reached the device yet.
pub struct CpalSink {
    queue: Arc<Mutex<VecDeque<i16>>>,
    stream: Mutex<Option<SendableStream>>,
    sample_rate: u32,
}

impl CpalSink {
    pub fn new(sample_rate: u32) -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .context("No default output device available")?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        info!("Opening speaker '{}' ({}Hz mono)", name, sample_rate);

        let stream_config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let queue: Arc<Mutex<VecDeque<i16>>> = Arc::new(Mutex::new(VecDeque::new()));
        let callback_queue = Arc::clone(&queue);

        let stream = device
            .build_output_stream(
                &stream_config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut queue = callback_queue.lock().unwrap();
                    for slot in out.iter_mut() {
                        *slot = queue
                            .pop_front()
                            .map(|s| s as f32 / 32768.0)
                            .unwrap_or(0.0);
                    }
                },
                |err| error!("output stream error: {}", err),
                None,
            )
            .context("Failed to open speaker stream")?;

        stream.play().context("Failed to start speaker stream")?;

        Ok(Self {
            queue,
            stream: Mutex::new(Some(SendableStream(stream))),
            sample_rate,
        })
    }
}

impl super::playback::AudioSink for CpalSink {
    fn play(&self, samples: Vec<i16>, sample_rate: u32) -> Result<()> {
        if sample_rate != self.sample_rate {
            warn!(
                "sink opened at {}Hz but chunk is {}Hz, playing as-is",
                self.sample_rate, sample_rate
            );
        }
        self.queue.lock().unwrap().extend(samples);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.queue.lock().unwrap().clear();
        Ok(())
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.lock().unwrap().take() {
            let _ = stream.0.pause();
        }
    }
}
