use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::backend::{CaptureStream, InputBackend};
use super::buffer_pool::CaptureSide;
use crate::error::AudioError;

/// Synthetic input backend used for deterministic testing and tooling.
///
/// Loops a prepared mono signal into the frame pool in real-time sized
/// chunks, as if it were coming from a microphone. A failing variant stands
/// in for a denied or missing microphone.
#[derive(Debug, Clone)]
pub struct SignalBackend {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    chunk_size: usize,
    failure: Option<AudioError>,
}

impl SignalBackend {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
            chunk_size: 256,
            failure: None,
        }
    }

    /// A pure sine at `frequency`, one second long, looped
    pub fn tone(frequency: f32, sample_rate: u32) -> Self {
        let samples = (0..sample_rate as usize)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5
            })
            .collect();
        Self::new(samples, sample_rate)
    }

    /// A backend whose `open` always fails with `err`
    pub fn failing(err: AudioError) -> Self {
        Self {
            samples: Arc::new(Vec::new()),
            sample_rate: 48_000,
            chunk_size: 256,
            failure: Some(err),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl InputBackend for SignalBackend {
    fn name(&self) -> &'static str {
        "signal"
    }

    fn open(&self, mut capture: CaptureSide) -> Result<Box<dyn CaptureStream>, AudioError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.samples.is_empty() || self.sample_rate == 0 {
            return Err(AudioError::StreamOpenFailed {
                reason: "signal backend has no samples".to_string(),
            });
        }

        let running = Arc::new(AtomicBool::new(true));
        let dropped = Arc::new(AtomicU64::new(0));
        let samples = Arc::clone(&self.samples);
        let chunk_size = self.chunk_size;
        let chunk_period =
            Duration::from_secs_f64(chunk_size as f64 / f64::from(self.sample_rate));
        let thread_running = Arc::clone(&running);
        let thread_dropped = Arc::clone(&dropped);

        let thread = thread::Builder::new()
            .name("vocal-range-signal".to_string())
            .spawn(move || {
                let mut position = 0;
                let mut chunk = Vec::with_capacity(chunk_size);
                while thread_running.load(Ordering::Acquire) {
                    chunk.clear();
                    while chunk.len() < chunk_size {
                        chunk.push(samples[position]);
                        position = (position + 1) % samples.len();
                    }
                    let lost = capture.push_interleaved(&chunk, 1, |s| s);
                    thread_dropped.fetch_add(lost as u64, Ordering::Relaxed);
                    thread::sleep(chunk_period);
                }
            })
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to spawn signal thread: {}", e),
            })?;

        Ok(Box::new(SignalStream {
            sample_rate: self.sample_rate,
            running,
            dropped,
            thread: Some(thread),
        }))
    }
}

struct SignalStream {
    sample_rate: u32,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl SignalStream {
    fn shutdown(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Release);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| AudioError::StreamFailure {
                reason: "signal thread panicked".to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl CaptureStream for SignalStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn close(mut self: Box<Self>) -> Result<(), AudioError> {
        self.shutdown()
    }
}

impl Drop for SignalStream {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
