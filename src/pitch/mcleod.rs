// McLeod pitch method (MPM)
//
// Computes the normalized square difference function (NSDF) of a window,
// picks the highest maximum of every positive lobe ("key maxima") and
// selects the first one that comes close enough to the overall best. The
// autocorrelation term is computed with a zero-padded FFT so one window
// costs O(n log n).

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::{PitchDetector, PitchEstimate};
use crate::config::DetectionConfig;

/// Default fraction of the best key maximum a peak must reach
pub const DEFAULT_CUTOFF: f32 = 0.97;

/// McLeod pitch detector with pre-planned FFTs and scratch buffers
pub struct McLeodDetector {
    window_size: usize,
    fft_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    nsdf: Vec<f32>,
    key_maxima: Vec<usize>,
    cutoff: f32,
    min_rms: f32,
}

impl McLeodDetector {
    /// Create a detector for windows of `window_size` samples
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(4);
        let fft_size = (2 * window_size).next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        Self {
            window_size,
            fft_size,
            forward,
            inverse,
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            nsdf: vec![0.0; window_size],
            key_maxima: Vec::with_capacity(window_size / 4),
            cutoff: DEFAULT_CUTOFF,
            min_rms: 0.0,
        }
    }

    /// Create a detector using the window size, cutoff and silence gate
    /// from the detection config
    pub fn with_config(config: &DetectionConfig) -> Self {
        Self::new(config.window_size)
            .with_cutoff(config.cutoff)
            .with_min_rms(config.min_rms)
    }

    pub fn with_cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = cutoff.clamp(0.0, 1.0);
        self
    }

    pub fn with_min_rms(mut self, min_rms: f32) -> Self {
        self.min_rms = min_rms.max(0.0);
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// NSDF values from the most recent call, indexed by lag
    pub fn nsdf(&self) -> &[f32] {
        &self.nsdf
    }

    /// Fill `self.nsdf` for every lag `0..n`
    fn compute_nsdf(&mut self, signal: &[f32]) {
        let n = signal.len();

        for (i, slot) in self.spectrum.iter_mut().enumerate() {
            let sample = if i < n { signal[i] } else { 0.0 };
            *slot = Complex::new(sample, 0.0);
        }

        // Autocorrelation via Wiener-Khinchin: IFFT(|FFT(x)|^2)
        self.forward.process(&mut self.spectrum);
        for bin in self.spectrum.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut self.spectrum);
        let scale = 1.0 / self.fft_size as f64;

        // m'(tau) = sum_{j=0}^{n-1-tau} x_j^2 + x_{j+tau}^2, updated incrementally
        let mut m: f64 = 2.0 * signal.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>();
        for tau in 0..self.nsdf.len() {
            if tau > 0 {
                let head = f64::from(signal[tau - 1]);
                let tail = f64::from(signal[n - tau]);
                m -= head * head + tail * tail;
            }
            let r = f64::from(self.spectrum[tau].re) * scale;
            self.nsdf[tau] = if m > f64::EPSILON {
                (2.0 * r / m) as f32
            } else {
                0.0
            };
        }
    }

    /// Collect the highest local maximum of each positive lobe, skipping
    /// the lobe around lag zero
    fn collect_key_maxima(&mut self) {
        self.key_maxima.clear();
        let nsdf = &self.nsdf;
        // The last quarter of lags overlaps too few samples to be trusted
        let len = nsdf.len() - nsdf.len() / 4;
        if len < 3 {
            return;
        }

        let mut pos = 0;
        while pos < (len - 1) / 3 && nsdf[pos] > 0.0 {
            pos += 1;
        }
        while pos < len - 1 && nsdf[pos] <= 0.0 {
            pos += 1;
        }
        if pos == 0 {
            pos = 1;
        }

        let mut current_max = 0;
        while pos < len - 1 {
            if nsdf[pos] > nsdf[pos - 1]
                && nsdf[pos] >= nsdf[pos + 1]
                && (current_max == 0 || nsdf[pos] > nsdf[current_max])
            {
                current_max = pos;
            }
            pos += 1;

            if pos < len - 1 && nsdf[pos] <= 0.0 {
                if current_max > 0 {
                    self.key_maxima.push(current_max);
                    current_max = 0;
                }
                while pos < len - 1 && nsdf[pos] <= 0.0 {
                    pos += 1;
                }
            }
        }
        if current_max > 0 {
            self.key_maxima.push(current_max);
        }
    }

    /// Parabolic interpolation around `index`, returning (lag, peak value)
    fn interpolate(&self, index: usize) -> (f32, f32) {
        let a = self.nsdf[index - 1];
        let b = self.nsdf[index];
        let c = self.nsdf[index + 1];
        let denominator = a - 2.0 * b + c;
        if denominator.abs() < f32::EPSILON {
            return (index as f32, b);
        }
        let offset = 0.5 * (a - c) / denominator;
        (index as f32 + offset, b - 0.25 * (a - c) * offset)
    }
}

fn rms(signal: &[f32]) -> f32 {
    let sum_squares: f64 = signal.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    (sum_squares / signal.len() as f64).sqrt() as f32
}

impl PitchDetector for McLeodDetector {
    fn detect_pitch(&mut self, buffer: &[f32], sample_rate: u32) -> PitchEstimate {
        if buffer.len() < 4 || sample_rate == 0 {
            return PitchEstimate::none();
        }
        if buffer.len() != self.window_size {
            let cutoff = self.cutoff;
            let min_rms = self.min_rms;
            *self = McLeodDetector::new(buffer.len())
                .with_cutoff(cutoff)
                .with_min_rms(min_rms);
        }
        if self.min_rms > 0.0 && rms(buffer) < self.min_rms {
            return PitchEstimate::none();
        }

        self.compute_nsdf(buffer);
        self.collect_key_maxima();

        let best = self
            .key_maxima
            .iter()
            .map(|&i| self.nsdf[i])
            .fold(f32::NEG_INFINITY, f32::max);
        if !best.is_finite() || best <= 0.0 {
            return PitchEstimate::none();
        }

        let threshold = self.cutoff * best;
        let chosen = match self.key_maxima.iter().find(|&&i| self.nsdf[i] >= threshold) {
            Some(&index) => index,
            None => return PitchEstimate::none(),
        };

        let (lag, peak) = self.interpolate(chosen);
        if lag <= 0.0 {
            return PitchEstimate::none();
        }

        PitchEstimate::new(sample_rate as f32 / lag, peak.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5
            })
            .collect()
    }

    #[test]
    fn test_detects_a4() {
        let mut detector = McLeodDetector::new(2048);
        let estimate = detector.detect_pitch(&sine(440.0, 48_000, 2048), 48_000);
        let frequency = estimate.frequency.expect("pitch for pure tone");
        assert!((frequency - 440.0).abs() < 2.0, "got {}", frequency);
        assert!(estimate.clarity > 0.95, "clarity {}", estimate.clarity);
    }

    #[test]
    fn test_detects_low_voice() {
        let mut detector = McLeodDetector::new(2048);
        let estimate = detector.detect_pitch(&sine(110.0, 44_100, 2048), 44_100);
        let frequency = estimate.frequency.expect("pitch for pure tone");
        assert!((frequency - 110.0).abs() < 1.5, "got {}", frequency);
        assert!(estimate.clarity > 0.95);
    }

    #[test]
    fn test_detects_low_note_at_high_sample_rate() {
        // Under two periods fit in the window at 96 kHz
        let mut detector = McLeodDetector::new(2048);
        let estimate = detector.detect_pitch(&sine(85.0, 96_000, 2048), 96_000);
        let frequency = estimate.frequency.expect("pitch for low tone");
        assert!((frequency - 85.0).abs() < 1.0, "got {}", frequency);
        assert!(estimate.clarity > 0.95, "clarity {}", estimate.clarity);
    }

    #[test]
    fn test_nsdf_covers_whole_window() {
        let mut detector = McLeodDetector::new(2048);
        detector.detect_pitch(&sine(90.0, 96_000, 2048), 96_000);
        assert_eq!(detector.nsdf().len(), 2048);
    }

    #[test]
    fn test_harmonics_do_not_cause_octave_error() {
        let sample_rate = 48_000;
        let signal: Vec<f32> = (0..2048)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let w = 2.0 * std::f32::consts::PI * 220.0 * t;
                0.5 * w.sin() + 0.25 * (2.0 * w).sin() + 0.12 * (3.0 * w).sin()
            })
            .collect();

        let mut detector = McLeodDetector::new(2048);
        let estimate = detector.detect_pitch(&signal, sample_rate);
        let frequency = estimate.frequency.expect("pitch for harmonic tone");
        assert!((frequency - 220.0).abs() < 2.0, "got {}", frequency);
    }

    #[test]
    fn test_silence_has_no_pitch() {
        let mut detector = McLeodDetector::new(2048);
        let estimate = detector.detect_pitch(&vec![0.0; 2048], 48_000);
        assert_eq!(estimate, PitchEstimate::none());
    }

    #[test]
    fn test_noise_is_not_clear() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise: Vec<f32> = (0..2048).map(|_| rng.gen_range(-0.5..0.5)).collect();
        let mut detector = McLeodDetector::new(2048);
        let estimate = detector.detect_pitch(&noise, 48_000);
        assert!(estimate.clarity <= 0.95, "clarity {}", estimate.clarity);
    }

    #[test]
    fn test_min_rms_gate() {
        let mut detector = McLeodDetector::new(2048).with_min_rms(0.1);
        let quiet: Vec<f32> = sine(440.0, 48_000, 2048).iter().map(|x| x * 0.01).collect();
        assert_eq!(detector.detect_pitch(&quiet, 48_000).frequency, None);
    }

    #[test]
    fn test_resizes_for_other_window_lengths() {
        let mut detector = McLeodDetector::new(2048);
        let estimate = detector.detect_pitch(&sine(330.0, 48_000, 1024), 48_000);
        assert_eq!(detector.window_size(), 1024);
        let frequency = estimate.frequency.expect("pitch after resize");
        assert!((frequency - 330.0).abs() < 3.0, "got {}", frequency);
    }

    #[test]
    fn test_nsdf_starts_at_one() {
        let mut detector = McLeodDetector::new(2048);
        detector.detect_pitch(&sine(440.0, 48_000, 2048), 48_000);
        assert!((detector.nsdf()[0] - 1.0).abs() < 1e-3);
    }
}
