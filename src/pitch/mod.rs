// Pitch module - fundamental frequency estimation for monophonic voice
//
// The sampler only depends on the PitchDetector trait so any estimator that
// reports a frequency and a clarity in [0, 1] can be substituted. The
// bundled implementation is the McLeod pitch method.

pub mod mcleod;

pub use mcleod::McLeodDetector;

use serde::{Deserialize, Serialize};

/// Result of analysing one time-domain window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate {
    /// Detected fundamental in Hz, `None` when no periodicity was found
    pub frequency: Option<f32>,
    /// Periodicity strength in [0, 1]
    pub clarity: f32,
}

impl PitchEstimate {
    /// Estimate for windows with no usable pitch
    pub const fn none() -> Self {
        Self {
            frequency: None,
            clarity: 0.0,
        }
    }

    pub fn new(frequency: f32, clarity: f32) -> Self {
        Self {
            frequency: Some(frequency),
            clarity,
        }
    }
}

/// Pitch estimator consulted once per sampler tick
///
/// Implementations may keep scratch buffers between calls, hence `&mut self`.
pub trait PitchDetector: Send {
    fn detect_pitch(&mut self, buffer: &[f32], sample_rate: u32) -> PitchEstimate;
}

impl<D: PitchDetector + ?Sized> PitchDetector for Box<D> {
    fn detect_pitch(&mut self, buffer: &[f32], sample_rate: u32) -> PitchEstimate {
        (**self).detect_pitch(buffer, sample_rate)
    }
}

/// Factory producing a fresh detector for each recording
pub type DetectorFactory = Box<dyn Fn() -> Box<dyn PitchDetector> + Send + Sync>;
