// Sampler - per-frame pitch sampling loop
//
// Runs on its own thread, one tick per display frame:
// drain captured frames -> keep the newest window -> detect pitch ->
// gate -> fold into the shared RangeTracker -> publish RangeEvents.
//
// Cancellation is deterministic: the stop token is flipped while the
// tracker lock is held and every update re-checks it under the same lock,
// so once `SamplerTask::cancel` has taken the lock no further sample lands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::audio::buffer_pool::SamplerSide;
use crate::error::AudioError;
use crate::pitch::PitchDetector;
use crate::tracker::{RangeEvent, RangeTracker, SampleGate};

/// Cooperative cancellation flag shared with the sampler thread
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    cancelled: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Fewer than `window_size` samples captured so far
    Filling,
    /// Estimate failed the clarity or band gate
    Rejected,
    /// Estimate accepted; `changed` tells whether an extreme moved
    Accepted { changed: bool },
    /// Stop was requested before the sample could be applied
    Cancelled,
}

/// Counters reported when the sampler exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub ticks: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub samples_drained: u64,
}

/// Everything the sampler thread needs, bundled so the session can hand it
/// over in one move
pub struct SamplerContext {
    pub input: SamplerSide,
    pub sample_rate: u32,
    pub detector: Box<dyn PitchDetector>,
    pub gate: SampleGate,
    pub window_size: usize,
    pub tick_interval: Duration,
    pub tracker: Arc<Mutex<RangeTracker>>,
    pub events: broadcast::Sender<RangeEvent>,
    pub stop: StopToken,
}

/// Pitch sampling state machine; one `tick` per display frame
pub struct PitchSampler {
    ctx: SamplerContext,
    window: Vec<f32>,
    stats: SamplerStats,
}

fn lock_tracker(tracker: &Mutex<RangeTracker>) -> Result<MutexGuard<'_, RangeTracker>, AudioError> {
    tracker.lock().map_err(|_| AudioError::LockPoisoned {
        component: "range_tracker".to_string(),
    })
}

impl PitchSampler {
    pub fn new(ctx: SamplerContext) -> Self {
        let window_size = ctx.window_size.max(4);
        Self {
            window: Vec::with_capacity(window_size * 2),
            ctx: SamplerContext { window_size, ..ctx },
            stats: SamplerStats::default(),
        }
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    /// Pull newly captured audio, keeping only the most recent window
    fn refill_window(&mut self) {
        let window = &mut self.window;
        let drained = self
            .ctx
            .input
            .drain_into(|samples| window.extend_from_slice(samples));
        self.stats.samples_drained += drained as u64;

        let excess = self.window.len().saturating_sub(self.ctx.window_size);
        if excess > 0 {
            self.window.drain(..excess);
        }
    }

    pub fn tick(&mut self) -> Result<TickOutcome, AudioError> {
        self.stats.ticks += 1;
        self.refill_window();

        if self.window.len() < self.ctx.window_size {
            return Ok(TickOutcome::Filling);
        }

        let estimate = self
            .ctx
            .detector
            .detect_pitch(&self.window, self.ctx.sample_rate);
        let frequency = match self.ctx.gate.accept(&estimate) {
            Some(frequency) => frequency,
            None => {
                self.stats.rejected += 1;
                return Ok(TickOutcome::Rejected);
            }
        };

        let mut tracker = lock_tracker(&self.ctx.tracker)?;
        if self.ctx.stop.is_cancelled() {
            return Ok(TickOutcome::Cancelled);
        }
        let events = tracker.observe(frequency);
        self.stats.accepted += 1;
        let changed = !events.is_empty();
        for event in events {
            tracing::debug!("[Sampler] {:?}", event);
            // No subscribers is fine
            let _ = self.ctx.events.send(event);
        }
        drop(tracker);

        Ok(TickOutcome::Accepted { changed })
    }

    /// Tick once per interval until the stop token is set
    pub fn run(mut self) -> SamplerStats {
        tracing::info!(
            "[Sampler] Starting at {} Hz, window {} samples, tick {:?}",
            self.ctx.sample_rate,
            self.ctx.window_size,
            self.ctx.tick_interval
        );

        while !self.ctx.stop.is_cancelled() {
            let started = Instant::now();
            match self.tick() {
                Ok(TickOutcome::Cancelled) => break,
                Ok(_) => {}
                Err(err) => {
                    tracing::error!("[Sampler] Tick failed, stopping: {}", err);
                    break;
                }
            }
            let remaining = self.ctx.tick_interval.saturating_sub(started.elapsed());
            if !remaining.is_zero() {
                // Woken early by SamplerTask::cancel
                thread::park_timeout(remaining);
            }
        }

        tracing::info!(
            "[Sampler] Stopped after {} ticks ({} accepted, {} rejected)",
            self.stats.ticks,
            self.stats.accepted,
            self.stats.rejected
        );
        self.stats
    }
}

/// Handle to a running sampler thread
pub struct SamplerTask {
    stop: StopToken,
    handle: JoinHandle<SamplerStats>,
}

impl SamplerTask {
    /// Cancel under the tracker lock, wake the thread and wait for it.
    ///
    /// After the lock is released no tick can modify the tracker.
    pub fn cancel(self, tracker: &Mutex<RangeTracker>) -> Result<SamplerStats, AudioError> {
        {
            let _guard = lock_tracker(tracker)?;
            self.stop.cancel();
        }
        self.handle.thread().unpark();
        self.handle.join().map_err(|_| AudioError::StreamFailure {
            reason: "sampler thread panicked".to_string(),
        })
    }
}

/// Spawn the sampling loop on a dedicated thread
pub fn spawn_sampler(ctx: SamplerContext) -> Result<SamplerTask, AudioError> {
    let stop = ctx.stop.clone();
    let handle = thread::Builder::new()
        .name("vocal-range-sampler".to_string())
        .spawn(move || PitchSampler::new(ctx).run())
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to spawn sampler thread: {}", e),
        })?;
    Ok(SamplerTask { stop, handle })
}
