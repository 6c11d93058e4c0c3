// RecordingSession: owns everything one vocal-range measurement needs
//
// Replaces process-wide state with an explicit object:
// - the RangeTracker shared with the sampler thread
// - the active capture stream + sampler task while recording
// - the broadcast channel carrying RangeEvents to displays
//
// start/stop/reset are independent: reset works while recording, stop keeps
// the measured extremes, and a failed start changes nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{info, warn};
use tokio::sync::broadcast;

use crate::audio::{BufferPool, CaptureStream, InputBackend};
use crate::config::AppConfig;
use crate::engine::{spawn_sampler, SamplerContext, SamplerTask, StopToken};
use crate::error::{log_audio_error, AudioError};
use crate::pitch::{DetectorFactory, McLeodDetector, PitchDetector};
use crate::tracker::{RangeEvent, RangeSnapshot, RangeTracker, SampleGate};

/// Capacity of the range event channel; slow subscribers see `Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capture stream and sampler that exist only while recording
struct ActiveRecording {
    capture: Box<dyn CaptureStream>,
    sampler: SamplerTask,
}

/// Clears the starting flag when a start attempt ends
struct StartGuard<'a>(&'a AtomicBool);

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A vocal-range measurement session
///
/// # Example
/// ```ignore
/// let session = RecordingSession::new(Arc::new(CpalBackend::new()), AppConfig::load());
/// session.start()?;
/// // ... sing ...
/// session.stop()?;
/// let (lowest, highest) = session.snapshot()?.note_numbers();
/// ```
pub struct RecordingSession {
    config: AppConfig,
    backend: Arc<dyn InputBackend>,
    detector_factory: DetectorFactory,
    tracker: Arc<Mutex<RangeTracker>>,
    events: broadcast::Sender<RangeEvent>,
    active: Mutex<Option<ActiveRecording>>,
    /// Set while a start is opening the device
    starting: AtomicBool,
}

impl RecordingSession {
    /// Create an idle session using the McLeod detector from `config`
    pub fn new(backend: Arc<dyn InputBackend>, config: AppConfig) -> Self {
        let detection = config.detection.clone();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            backend,
            detector_factory: Box::new(move || {
                Box::new(McLeodDetector::with_config(&detection)) as Box<dyn PitchDetector>
            }),
            tracker: Arc::new(Mutex::new(RangeTracker::new())),
            events,
            active: Mutex::new(None),
            starting: AtomicBool::new(false),
        }
    }

    /// Substitute the pitch detector used for subsequent recordings
    pub fn with_detector_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn PitchDetector> + Send + Sync + 'static,
    {
        self.detector_factory = Box::new(factory);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ========================================================================
    // LOCK HELPER METHODS
    // ========================================================================

    fn lock_active(&self) -> Result<MutexGuard<'_, Option<ActiveRecording>>, AudioError> {
        self.active.lock().map_err(|_| {
            let err = AudioError::LockPoisoned {
                component: "active_recording".to_string(),
            };
            log_audio_error(&err, "lock_active");
            err
        })
    }

    fn lock_tracker(&self) -> Result<MutexGuard<'_, RangeTracker>, AudioError> {
        self.tracker.lock().map_err(|_| {
            let err = AudioError::LockPoisoned {
                component: "range_tracker".to_string(),
            };
            log_audio_error(&err, "lock_tracker");
            err
        })
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Open the microphone and start sampling.
    ///
    /// The device is opened without holding the session lock, so
    /// `is_recording`, `snapshot` and `reset` answer while a slow device
    /// comes up.
    ///
    /// # Errors
    /// - `AlreadyRecording` if a recording is active or being started
    /// - whatever the backend reports (`PermissionDenied`,
    ///   `DeviceUnavailable`, ...); the session is left untouched
    pub fn start(&self) -> Result<(), AudioError> {
        let _starting = self.begin_start().map_err(|err| {
            log_audio_error(&err, "start");
            err
        })?;

        let recording = self.open_recording().map_err(|err| {
            log_audio_error(&err, "start");
            err
        })?;
        let sample_rate = recording.capture.sample_rate();

        match self.lock_active() {
            Ok(mut active) => *active = Some(recording),
            Err(err) => {
                if let Err(close_err) = self.shutdown(recording) {
                    log_audio_error(&close_err, "start_cleanup");
                }
                return Err(err);
            }
        }

        info!(
            "[Session] Recording started via {} backend at {} Hz",
            self.backend.name(),
            sample_rate
        );
        Ok(())
    }

    /// Claim the right to start; held until the start attempt finishes
    fn begin_start(&self) -> Result<StartGuard<'_>, AudioError> {
        if self.starting.swap(true, Ordering::AcqRel) {
            return Err(AudioError::AlreadyRecording);
        }
        let guard = StartGuard(&self.starting);
        if self.lock_active()?.is_some() {
            return Err(AudioError::AlreadyRecording);
        }
        Ok(guard)
    }

    /// Open the backend and spawn a sampler reading from it
    fn open_recording(&self) -> Result<ActiveRecording, AudioError> {
        let audio = &self.config.audio;
        let (capture_side, sampler_side) =
            BufferPool::new(audio.frame_count.max(1), audio.frame_size.max(1)).split_for_threads();

        let capture = self.backend.open(capture_side)?;

        let ctx = SamplerContext {
            input: sampler_side,
            sample_rate: capture.sample_rate(),
            detector: (self.detector_factory)(),
            gate: SampleGate::from_config(&self.config.detection),
            window_size: self.config.detection.window_size,
            tick_interval: Duration::from_millis(audio.tick_interval_ms.max(1)),
            tracker: Arc::clone(&self.tracker),
            events: self.events.clone(),
            stop: StopToken::new(),
        };

        match spawn_sampler(ctx) {
            Ok(sampler) => Ok(ActiveRecording { capture, sampler }),
            Err(err) => {
                if let Err(close_err) = capture.close() {
                    log_audio_error(&close_err, "start_cleanup");
                }
                Err(err)
            }
        }
    }

    /// Stop sampling and release the microphone, keeping the extremes.
    ///
    /// Safe to call when not recording.
    pub fn stop(&self) -> Result<(), AudioError> {
        let recording = self.lock_active()?.take();
        match recording {
            Some(recording) => self.shutdown(recording),
            None => Ok(()),
        }
    }

    fn shutdown(&self, recording: ActiveRecording) -> Result<(), AudioError> {
        let ActiveRecording { capture, sampler } = recording;

        // Always close the capture stream, even if the sampler failed.
        let sampler_result = sampler.cancel(&self.tracker);
        let close_result = capture.close();

        match (sampler_result, close_result) {
            (Ok(stats), Ok(())) => {
                info!(
                    "[Session] Recording stopped ({} ticks, {} accepted)",
                    stats.ticks, stats.accepted
                );
                Ok(())
            }
            (Err(err), _) | (_, Err(err)) => {
                log_audio_error(&err, "stop");
                Err(err)
            }
        }
    }

    /// Clear the extremes; recording, if any, carries on
    pub fn reset(&self) -> Result<(), AudioError> {
        let mut tracker = self.lock_tracker()?;
        let event = tracker.reset();
        let _ = self.events.send(event);
        info!("[Session] Range reset");
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.active
            .lock()
            .map(|active| active.is_some())
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> Result<RangeSnapshot, AudioError> {
        let recording = self.is_recording();
        Ok(self.lock_tracker()?.snapshot(recording))
    }

    /// Receive every RangeEvent published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RangeEvent> {
        self.events.subscribe()
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        let recording = match self.active.get_mut() {
            Ok(active) => active.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(recording) = recording {
            warn!("[Session] Dropped while recording, releasing input");
            let _ = self.shutdown(recording);
        }
    }
}
