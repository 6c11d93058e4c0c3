//! Offline range analysis of recorded audio.
//!
//! Replays a recording through the same detector, gate and tracker the live
//! sampler uses, stepping one display frame of audio per window, so a WAV
//! file yields the range a live session would have measured.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::config::AppConfig;
use crate::pitch::{McLeodDetector, PitchDetector};
use crate::tracker::{RangeSnapshot, RangeTracker, SampleGate};

/// Outcome of analysing one recording
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub sample_rate: u32,
    pub duration_secs: f32,
    /// Windows handed to the detector
    pub windows: usize,
    /// Windows that passed the gate
    pub accepted: usize,
    pub range: RangeSnapshot,
}

/// Samples between consecutive windows for a given tick period
pub fn frame_hop(sample_rate: u32, tick_interval_ms: u64) -> usize {
    ((u64::from(sample_rate) * tick_interval_ms.max(1)) / 1000).max(1) as usize
}

/// Slide a `window_size` window over `samples` in steps of `hop`.
///
/// Recordings shorter than one window produce an empty report.
pub fn analyze_samples(
    samples: &[f32],
    sample_rate: u32,
    detector: &mut dyn PitchDetector,
    gate: &SampleGate,
    window_size: usize,
    hop: usize,
) -> AnalysisReport {
    let hop = hop.max(1);
    let mut tracker = RangeTracker::new();
    let mut windows = 0;
    let mut accepted = 0;

    if window_size > 0 && samples.len() >= window_size {
        for start in (0..=samples.len() - window_size).step_by(hop) {
            let estimate = detector.detect_pitch(&samples[start..start + window_size], sample_rate);
            windows += 1;
            if let Some(frequency) = gate.accept(&estimate) {
                accepted += 1;
                tracker.observe(frequency);
            }
        }
    }

    let duration_secs = if sample_rate > 0 {
        samples.len() as f32 / sample_rate as f32
    } else {
        0.0
    };

    log::debug!(
        "[Analysis] {} windows, {} accepted over {:.2}s",
        windows,
        accepted,
        duration_secs
    );

    AnalysisReport {
        sample_rate,
        duration_secs,
        windows,
        accepted,
        range: tracker.snapshot(false),
    }
}

/// Decode a WAV file to mono f32 samples (first channel) and its sample rate
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(anyhow!(
                    "Unsupported bits per sample {} in {}",
                    spec.bits_per_sample,
                    path.display()
                ));
            }
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| {
                    sample
                        .map(|value| value as f32 / scale)
                        .map_err(|err| anyhow!(err))
                })
                .collect::<Result<Vec<f32>>>()?
        }
    };

    let samples = interleaved.into_iter().step_by(channels).collect();
    Ok((samples, spec.sample_rate))
}

/// Measure the range sung in a WAV recording using `config`
pub fn analyze_wav(path: &Path, config: &AppConfig) -> Result<AnalysisReport> {
    let (samples, sample_rate) =
        read_wav(path).with_context(|| format!("decoding {}", path.display()))?;
    if sample_rate == 0 {
        return Err(anyhow!("{} reports a sample rate of 0", path.display()));
    }

    let mut detector = McLeodDetector::with_config(&config.detection);
    let gate = SampleGate::from_config(&config.detection);
    let hop = frame_hop(sample_rate, config.audio.tick_interval_ms);

    log::info!(
        "[Analysis] {}: {} samples at {} Hz, hop {}",
        path.display(),
        samples.len(),
        sample_rate,
        hop
    );

    Ok(analyze_samples(
        &samples,
        sample_rate,
        &mut detector,
        &gate,
        config.detection.window_size,
        hop,
    ))
}
