//! Backend abstractions for audio input.
//!
//! A backend turns a [`CaptureSide`] into a running stream that keeps
//! pushing mono frames until it is closed. The session owns the returned
//! [`CaptureStream`] for exactly as long as it is recording.

use super::buffer_pool::CaptureSide;
use crate::error::AudioError;

/// Trait implemented by audio input sources.
///
/// `open` must either return a running stream or an error without leaving
/// anything running behind.
pub trait InputBackend: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    fn open(&self, capture: CaptureSide) -> Result<Box<dyn CaptureStream>, AudioError>;
}

/// A running capture stream.
///
/// Dropping the stream must release the device as well; `close` exists so
/// the caller can observe failures while doing so.
pub trait CaptureStream: Send {
    fn sample_rate(&self) -> u32;

    /// Samples discarded because the sampler fell behind
    fn dropped_samples(&self) -> u64 {
        0
    }

    fn close(self: Box<Self>) -> Result<(), AudioError>;
}
