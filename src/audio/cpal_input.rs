//! CPAL-based microphone input for desktop platforms (Linux, macOS, Windows)
//!
//! `cpal::Stream` is not `Send` on every host, so the stream is built and
//! owned by a dedicated capture thread. The session only holds a handle that
//! tells the thread to drop the stream, which stops the device and releases
//! the microphone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info, warn};

use super::backend::{CaptureStream, InputBackend};
use super::buffer_pool::CaptureSide;
use crate::error::{log_audio_error, AudioError};

/// Microphone backend using the default CPAL host
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    /// Input device name; the host default is used when `None`
    device_name: Option<String>,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture from the first input device whose name contains `name`
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    /// Names of the input devices the default host exposes
    pub fn list_devices() -> Result<Vec<String>, AudioError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to enumerate input devices: {}", e),
            })?;
        Ok(devices.filter_map(|device| device.name().ok()).collect())
    }
}

impl InputBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open(&self, capture: CaptureSide) -> Result<Box<dyn CaptureStream>, AudioError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, AudioError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let dropped = Arc::new(AtomicU64::new(0));
        let device_name = self.device_name.clone();
        let dropped_in_thread = Arc::clone(&dropped);

        let thread = thread::Builder::new()
            .name("vocal-range-capture".to_string())
            .spawn(move || {
                let (stream, sample_rate) =
                    match build_input_stream(device_name.as_deref(), capture, dropped_in_thread) {
                        Ok(built) => built,
                        Err(err) => {
                            let _ = ready_tx.send(Err(err));
                            return;
                        }
                    };
                let _ = ready_tx.send(Ok(sample_rate));

                // Park until close() is called or the handle is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                info!("[Capture] Input stream closed");
            })
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to spawn capture thread: {}", e),
            })?;

        match ready_rx.recv() {
            Ok(Ok(sample_rate)) => {
                info!("[Capture] Input stream running at {} Hz", sample_rate);
                Ok(Box::new(CpalCapture {
                    sample_rate,
                    dropped,
                    stop_tx: Some(stop_tx),
                    thread: Some(thread),
                }))
            }
            Ok(Err(err)) => {
                let _ = thread.join();
                log_audio_error(&err, "cpal_open");
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                let err = AudioError::StreamFailure {
                    reason: "capture thread exited before reporting".to_string(),
                };
                log_audio_error(&err, "cpal_open");
                Err(err)
            }
        }
    }
}

fn find_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, AudioError> {
    match name {
        None => host.default_input_device().ok_or(AudioError::DeviceUnavailable),
        Some(wanted) => host
            .input_devices()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to enumerate input devices: {}", e),
            })?
            .find(|device| {
                device
                    .name()
                    .map(|actual| actual.contains(wanted))
                    .unwrap_or(false)
            })
            .ok_or(AudioError::DeviceUnavailable),
    }
}

fn build_input_stream(
    device_name: Option<&str>,
    mut capture: CaptureSide,
    dropped: Arc<AtomicU64>,
) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let device = find_device(&host, device_name)?;

    let config = device
        .default_input_config()
        .map_err(map_default_config_error)?;
    let sample_format = config.sample_format();
    let stream_config: cpal::StreamConfig = config.into();
    let channels = stream_config.channels as usize;
    let sample_rate = stream_config.sample_rate.0;

    let err_fn = |err: cpal::StreamError| error!("[Capture] Input stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let lost = capture.push_interleaved(data, channels, |s| s);
                if lost > 0 {
                    dropped.fetch_add(lost as u64, Ordering::Relaxed);
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let lost = capture.push_interleaved(data, channels, |s| s as f32 / 32768.0);
                if lost > 0 {
                    dropped.fetch_add(lost as u64, Ordering::Relaxed);
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let lost = capture
                    .push_interleaved(data, channels, |s| (s as f32 - 32768.0) / 32768.0);
                if lost > 0 {
                    dropped.fetch_add(lost as u64, Ordering::Relaxed);
                }
            },
            err_fn,
            None,
        ),
        other => {
            return Err(AudioError::UnsupportedFormat {
                format: format!("{:?}", other),
            })
        }
    }
    .map_err(map_build_error)?;

    stream.play().map_err(|e| match e {
        cpal::PlayStreamError::DeviceNotAvailable => AudioError::DeviceUnavailable,
        other => classify_backend_failure(format!("Input start failed: {}", other)),
    })?;

    Ok((stream, sample_rate))
}

fn map_default_config_error(err: cpal::DefaultStreamConfigError) -> AudioError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => AudioError::DeviceUnavailable,
        other => classify_backend_failure(format!("Failed to get default input config: {}", other)),
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> AudioError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => AudioError::DeviceUnavailable,
        other => classify_backend_failure(format!("{}", other)),
    }
}

/// Hosts report access denial as backend-specific text
fn classify_backend_failure(reason: String) -> AudioError {
    let lowered = reason.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("not authorized") {
        AudioError::PermissionDenied
    } else {
        AudioError::StreamOpenFailed { reason }
    }
}

/// Handle to the capture thread owning the `cpal::Stream`
struct CpalCapture {
    sample_rate: u32,
    dropped: Arc<AtomicU64>,
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalCapture {
    fn shutdown(&mut self) -> Result<(), AudioError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| AudioError::StreamFailure {
                reason: "capture thread panicked".to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl CaptureStream for CpalCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn close(mut self: Box<Self>) -> Result<(), AudioError> {
        let dropped = self.dropped_samples();
        if dropped > 0 {
            warn!("[Capture] {} samples dropped while recording", dropped);
        }
        self.shutdown()
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log_audio_error(&err, "cpal_drop");
        }
    }
}
