//! Inbound audio scheduling
//!
//! The scheduler places each decoded chunk on the output timeline so that
//! chunks play back-to-back with no gap when they arrive faster than they
//! play, and never overlap regardless of arrival jitter. The scheduling
//! cursor (`next_start`) and the active handle set are guarded by a single
//! mutex: they are always updated as one logical step.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use super::backend::AudioChunk;
use super::pcm;

/// Monotonic timeline for the output device
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;
}

/// Wall-clock implementation anchored at creation time
pub struct DeviceClock {
    origin: Instant,
}

impl DeviceClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for DeviceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for DeviceClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Destination for decoded playback samples
///
/// `play` queues samples for immediate output; the scheduler owns all timing.
pub trait AudioSink: Send + Sync {
    fn play(&self, samples: Vec<i16>, sample_rate: u32) -> Result<()>;

    /// Drop everything queued but not yet played
    fn stop(&self) -> Result<()>;
}

/// Signals emitted by the scheduler toward the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The active set drained to zero through natural completion
    Drained,
}

/// Where one enqueued chunk landed on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledChunk {
    pub start: Duration,
    pub duration: Duration,
}

impl ScheduledChunk {
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }
}

struct Shared {
    next_start: Duration,
    // id -> abort handle; None until the playback task is registered
    active: HashMap<u64, Option<AbortHandle>>,
    next_id: u64,
}

/// Schedules inbound chunks back-to-back on the output clock and tracks every
/// in-flight playback handle for cancellation.
#[derive(Clone)]
pub struct PlaybackScheduler {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn AudioSink>,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl PlaybackScheduler {
    /// Create a scheduler with its cursor reset to the clock's current time.
    pub fn new(
        clock: Arc<dyn Clock>,
        sink: Arc<dyn AudioSink>,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Self {
        let next_start = clock.now();
        Self {
            clock,
            sink,
            shared: Arc::new(Mutex::new(Shared {
                next_start,
                active: HashMap::new(),
                next_id: 0,
            })),
            events,
        }
    }

    /// Decode a chunk and schedule it after everything already queued.
    ///
    /// A decode failure leaves the cursor and the active set untouched; the
    /// caller logs and skips the chunk.
    pub fn enqueue(&self, chunk: AudioChunk) -> Result<ScheduledChunk> {
        let samples = pcm::decode_pcm16(&chunk.data)?;
        let sample_rate = chunk.sample_rate;
        let duration = pcm::duration_of(samples.len() / chunk.channels.max(1) as usize, sample_rate);

        let (id, start) = {
            let mut shared = self.shared.lock().unwrap();
            let start = shared.next_start.max(self.clock.now());
            shared.next_start = start + duration;
            let id = shared.next_id;
            shared.next_id += 1;
            shared.active.insert(id, None);
            (id, start)
        };

        debug!(
            "scheduled chunk {} at {:?} for {:?} ({} samples)",
            id, start, duration, samples.len()
        );

        let clock = Arc::clone(&self.clock);
        let sink = Arc::clone(&self.sink);
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let delay = start.saturating_sub(clock.now());
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Err(e) = sink.play(samples, sample_rate) {
                warn!("playback write failed: {}", e);
            }
            tokio::time::sleep(duration).await;

            let drained = {
                let mut shared = shared.lock().unwrap();
                shared.active.remove(&id);
                shared.active.is_empty()
            };
            if drained {
                let _ = events.send(PlaybackEvent::Drained);
            }
        });

        // The task may already have completed for very short chunks; only
        // register the abort handle while the id is still in the set.
        {
            let mut shared = self.shared.lock().unwrap();
            if let Some(slot) = shared.active.get_mut(&id) {
                *slot = Some(task.abort_handle());
            }
        }

        Ok(ScheduledChunk { start, duration })
    }

    /// Stop every in-flight handle, clear the active set and reset the cursor
    /// to the clock's current time. Already-finished handles are a no-op.
    ///
    /// Used both for barge-in and for session teardown; it never emits
    /// `Drained`, the caller decides the resulting state.
    pub fn interrupt(&self) {
        let stopped = {
            let mut shared = self.shared.lock().unwrap();
            let stopped = shared.active.len();
            for (_, handle) in shared.active.drain() {
                if let Some(handle) = handle {
                    handle.abort();
                }
            }
            shared.next_start = self.clock.now();
            stopped
        };
        if let Err(e) = self.sink.stop() {
            warn!("failed to flush playback sink: {}", e);
        }
        debug!("playback interrupted, {} handles stopped", stopped);
    }

    /// Number of scheduled or playing handles
    pub fn active_len(&self) -> usize {
        self.shared.lock().unwrap().active.len()
    }

    /// Current value of the scheduling cursor
    pub fn next_start(&self) -> Duration {
        self.shared.lock().unwrap().next_start
    }
}
