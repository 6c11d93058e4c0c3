//! Running highest/lowest pitch tracking.
//!
//! [`SampleGate`] decides whether a detector estimate is trustworthy enough
//! to count, [`RangeTracker`] keeps the extremes and reports every change as
//! a [`RangeEvent`] so a display can follow along.

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::notes::{frequency_to_midi, frequency_to_note, NO_NOTE};
use crate::pitch::PitchEstimate;

/// Display text for a frequency that has not been measured
pub const NO_FREQUENCY: &str = "... Hz";

/// Acceptance rule applied to each detector estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleGate {
    /// Clarity must be strictly greater than this
    pub clarity_threshold: f32,
    /// Inclusive voice band
    pub min_frequency_hz: f32,
    pub max_frequency_hz: f32,
}

impl Default for SampleGate {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl SampleGate {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            clarity_threshold: config.clarity_threshold,
            min_frequency_hz: config.min_frequency_hz,
            max_frequency_hz: config.max_frequency_hz,
        }
    }

    /// Return the frequency if the estimate is clear, present and in band
    pub fn accept(&self, estimate: &PitchEstimate) -> Option<f32> {
        if estimate.clarity <= self.clarity_threshold {
            return None;
        }
        let frequency = estimate.frequency.filter(|f| *f != 0.0 && !f.is_nan())?;
        if frequency >= self.min_frequency_hz && frequency <= self.max_frequency_hz {
            Some(frequency)
        } else {
            None
        }
    }
}

/// Change notification emitted by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RangeEvent {
    Highest { frequency_hz: f32, note: String },
    Lowest { frequency_hz: f32, note: String },
    Reset,
}

/// Serializable view of the current extremes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSnapshot {
    pub highest_hz: Option<f32>,
    pub lowest_hz: Option<f32>,
    pub highest_note: String,
    pub lowest_note: String,
    pub highest_display: String,
    pub lowest_display: String,
    /// MIDI note numbers for song lookup, 0 when unmeasured
    pub highest_midi: i32,
    pub lowest_midi: i32,
    pub recording: bool,
}

impl RangeSnapshot {
    /// `(lowest_note, highest_note)` in the form the song lookup expects
    pub fn note_numbers(&self) -> (i32, i32) {
        (self.lowest_midi, self.highest_midi)
    }
}

/// Highest and lowest accepted frequencies of a session
#[derive(Debug, Clone, PartialEq)]
pub struct RangeTracker {
    highest: f32,
    lowest: f32,
    highest_note: String,
    lowest_note: String,
}

impl Default for RangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeTracker {
    pub fn new() -> Self {
        Self {
            highest: 0.0,
            lowest: f32::INFINITY,
            highest_note: NO_NOTE.to_string(),
            lowest_note: NO_NOTE.to_string(),
        }
    }

    /// Fold an accepted frequency into the extremes.
    ///
    /// Both bounds are checked on every sample, so the first sample sets
    /// both. Returns the events for whichever bounds moved.
    pub fn observe(&mut self, frequency: f32) -> Vec<RangeEvent> {
        let mut events = Vec::new();

        if frequency > self.highest {
            self.highest = frequency;
            self.highest_note = frequency_to_note(frequency);
            events.push(RangeEvent::Highest {
                frequency_hz: frequency,
                note: self.highest_note.clone(),
            });
        }

        if frequency > 0.0 && frequency < self.lowest {
            self.lowest = frequency;
            self.lowest_note = frequency_to_note(frequency);
            events.push(RangeEvent::Lowest {
                frequency_hz: frequency,
                note: self.lowest_note.clone(),
            });
        }

        events
    }

    /// Run an estimate through `gate` and observe it if accepted
    pub fn observe_estimate(&mut self, gate: &SampleGate, estimate: &PitchEstimate) -> Vec<RangeEvent> {
        match gate.accept(estimate) {
            Some(frequency) => self.observe(frequency),
            None => Vec::new(),
        }
    }

    /// Restore the sentinels: highest 0, lowest +inf, names "--"
    pub fn reset(&mut self) -> RangeEvent {
        *self = Self::new();
        RangeEvent::Reset
    }

    /// Raw highest frequency (0 when unmeasured)
    pub fn highest(&self) -> f32 {
        self.highest
    }

    /// Raw lowest frequency (+inf when unmeasured)
    pub fn lowest(&self) -> f32 {
        self.lowest
    }

    pub fn highest_hz(&self) -> Option<f32> {
        (self.highest > 0.0).then_some(self.highest)
    }

    pub fn lowest_hz(&self) -> Option<f32> {
        self.lowest.is_finite().then_some(self.lowest)
    }

    pub fn highest_note(&self) -> &str {
        &self.highest_note
    }

    pub fn lowest_note(&self) -> &str {
        &self.lowest_note
    }

    pub fn is_empty(&self) -> bool {
        self.highest_hz().is_none() && self.lowest_hz().is_none()
    }

    pub fn snapshot(&self, recording: bool) -> RangeSnapshot {
        RangeSnapshot {
            highest_hz: self.highest_hz(),
            lowest_hz: self.lowest_hz(),
            highest_note: self.highest_note.clone(),
            lowest_note: self.lowest_note.clone(),
            highest_display: display_frequency(self.highest_hz()),
            lowest_display: display_frequency(self.lowest_hz()),
            highest_midi: self.highest_hz().and_then(frequency_to_midi).unwrap_or(0),
            lowest_midi: self.lowest_hz().and_then(frequency_to_midi).unwrap_or(0),
            recording,
        }
    }
}

/// Format a measured frequency as whole hertz, or the "... Hz" placeholder
pub fn display_frequency(frequency: Option<f32>) -> String {
    match frequency {
        Some(hz) => format!("{} Hz", hz.round() as i64),
        None => NO_FREQUENCY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear(frequency: f32) -> PitchEstimate {
        PitchEstimate::new(frequency, 0.99)
    }

    #[test]
    fn test_initial_state() {
        let tracker = RangeTracker::new();
        assert_eq!(tracker.highest(), 0.0);
        assert_eq!(tracker.lowest(), f32::INFINITY);
        assert!(tracker.is_empty());
        let snapshot = tracker.snapshot(false);
        assert_eq!(snapshot.highest_note, "--");
        assert_eq!(snapshot.lowest_display, "... Hz");
        assert_eq!(snapshot.note_numbers(), (0, 0));
    }

    #[test]
    fn test_first_sample_sets_both_bounds() {
        let mut tracker = RangeTracker::new();
        let events = tracker.observe(220.0);
        assert_eq!(events.len(), 2);
        assert_eq!(tracker.highest(), 220.0);
        assert_eq!(tracker.lowest(), 220.0);
        assert_eq!(tracker.highest_note(), "A3");
        assert_eq!(tracker.lowest_note(), "A3");
    }

    #[test]
    fn test_extremes_follow_stream() {
        let gate = SampleGate::default();
        let mut tracker = RangeTracker::new();
        let stream = [300.0, 150.0, 620.0, 95.0, 400.0, 880.0, 120.0];
        for frequency in stream {
            tracker.observe_estimate(&gate, &clear(frequency));
        }
        assert_eq!(tracker.highest(), 880.0);
        assert_eq!(tracker.lowest(), 95.0);
        assert_eq!(tracker.highest_note(), "A5");
    }

    #[test]
    fn test_unclear_samples_are_ignored() {
        let gate = SampleGate::default();
        let mut tracker = RangeTracker::new();
        tracker.observe_estimate(&gate, &clear(200.0));

        assert!(tracker
            .observe_estimate(&gate, &PitchEstimate::new(900.0, 0.95))
            .is_empty());
        assert!(tracker
            .observe_estimate(&gate, &PitchEstimate::new(100.0, 0.5))
            .is_empty());
        assert_eq!(tracker.highest(), 200.0);
        assert_eq!(tracker.lowest(), 200.0);
    }

    #[test]
    fn test_out_of_band_samples_are_ignored() {
        let gate = SampleGate::default();
        let mut tracker = RangeTracker::new();
        assert!(tracker.observe_estimate(&gate, &clear(79.9)).is_empty());
        assert!(tracker.observe_estimate(&gate, &clear(1100.1)).is_empty());
        assert!(tracker.is_empty());

        // Band edges are inclusive
        tracker.observe_estimate(&gate, &clear(80.0));
        tracker.observe_estimate(&gate, &clear(1100.0));
        assert_eq!(tracker.lowest(), 80.0);
        assert_eq!(tracker.highest(), 1100.0);
    }

    #[test]
    fn test_missing_or_zero_pitch_is_ignored() {
        let gate = SampleGate::default();
        assert_eq!(
            gate.accept(&PitchEstimate {
                frequency: None,
                clarity: 1.0
            }),
            None
        );
        assert_eq!(gate.accept(&PitchEstimate::new(0.0, 1.0)), None);
        assert_eq!(gate.accept(&PitchEstimate::new(f32::NAN, 1.0)), None);
    }

    #[test]
    fn test_reset_restores_sentinels() {
        let mut tracker = RangeTracker::new();
        tracker.observe(150.0);
        tracker.observe(600.0);
        assert_eq!(tracker.reset(), RangeEvent::Reset);

        let snapshot = tracker.snapshot(true);
        assert_eq!(snapshot.highest_hz, None);
        assert_eq!(snapshot.lowest_hz, None);
        assert_eq!(snapshot.highest_note, "--");
        assert_eq!(snapshot.lowest_note, "--");
        assert_eq!(snapshot.highest_display, "... Hz");
        assert_eq!(snapshot.lowest_display, "... Hz");
        assert!(snapshot.recording);
    }

    #[test]
    fn test_snapshot_note_numbers() {
        let mut tracker = RangeTracker::new();
        tracker.observe(130.81);
        tracker.observe(523.25);
        let snapshot = tracker.snapshot(false);
        assert_eq!(snapshot.note_numbers(), (48, 72));
        assert_eq!(snapshot.highest_display, "523 Hz");
        assert_eq!(snapshot.lowest_display, "131 Hz");
    }

    #[test]
    fn test_event_serialization() {
        let event = RangeEvent::Highest {
            frequency_hz: 440.0,
            note: "A4".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "highest");
        assert_eq!(json["note"], "A4");
    }
}
