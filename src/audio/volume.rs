//! Input volume monitoring
//!
//! A periodic task samples the most recent capture audio, runs a fixed-size
//! frequency-domain transform over it and publishes a scalar level in
//! [0, 100] for UI feedback. Purely observational: it never affects whether
//! captured frames are transmitted.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::session::SessionEvent;

/// Analysis window size in samples (one FFT frame)
pub const ANALYSIS_WINDOW: usize = 256;

/// Sampling cadence, roughly display refresh
const TICK: Duration = Duration::from_millis(16);

// dB range mapped linearly onto [0, 100]
const FLOOR_DB: f32 = -100.0;
const CEIL_DB: f32 = -30.0;

/// Shared window over the most recent capture samples.
///
/// The capture callback pushes into it; the volume loop snapshots from it.
#[derive(Clone, Default)]
pub struct AnalysisTap {
    window: Arc<Mutex<VecDeque<f32>>>,
}

impl AnalysisTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append samples, keeping only the newest `ANALYSIS_WINDOW` of them.
    pub fn push(&self, samples: &[f32]) {
        let mut window = self.window.lock().unwrap();
        window.extend(samples.iter().copied());
        while window.len() > ANALYSIS_WINDOW {
            window.pop_front();
        }
    }

    /// Copy of the current window, zero-padded to exactly `ANALYSIS_WINDOW`.
    pub fn snapshot(&self) -> Vec<f32> {
        let window = self.window.lock().unwrap();
        let mut out = vec![0.0; ANALYSIS_WINDOW.saturating_sub(window.len())];
        out.extend(window.iter().copied());
        out
    }
}

/// Mean frequency-bin level of one analysis window, in [0, 100].
pub fn volume_level(fft: &dyn Fft<f32>, samples: &[f32]) -> f32 {
    let n = samples.len();
    if n == 0 {
        return 0.0;
    }
    let mut buf: Vec<Complex<f32>> = samples
        .iter()
        .map(|&s| Complex { re: s, im: 0.0 })
        .collect();
    fft.process(&mut buf);

    let bins = n / 2;
    let mut sum = 0.0f32;
    for bin in buf.iter().take(bins) {
        let magnitude = bin.norm() / bins as f32;
        let db = 20.0 * magnitude.max(1e-10).log10();
        let scaled = (db - FLOOR_DB) / (CEIL_DB - FLOOR_DB) * 100.0;
        sum += scaled.clamp(0.0, 100.0);
    }
    sum / bins as f32
}

/// Run the periodic volume monitor until the input stream goes inactive.
///
/// `active` is owned by the session context and cleared exactly when the
/// stream is released; the loop checks it on every tick and never touches the
/// tap after it breaks.
pub async fn run_monitor(
    tap: AnalysisTap,
    active: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(ANALYSIS_WINDOW);
    let mut ticker = tokio::time::interval(TICK);

    loop {
        ticker.tick().await;
        if !active.load(Ordering::SeqCst) {
            break;
        }
        let window = tap.snapshot();
        let level = volume_level(fft.as_ref(), &window);
        if events.send(SessionEvent::Volume(level)).is_err() {
            break;
        }
    }
    debug!("volume monitor stopped");
}
