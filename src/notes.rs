//! Frequency and MIDI note number to note-name conversion.
//!
//! Notes are named with sharps only, octave numbers follow the convention
//! where middle C (MIDI 60) is C4 and A4 (MIDI 69) is 440 Hz.

/// Pitch class symbols, indexed by `note_number mod 12` starting at C
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Placeholder shown when no note can be derived
pub const NO_NOTE: &str = "--";

/// Reference pitch for A4
pub const A4_FREQUENCY_HZ: f32 = 440.0;

/// MIDI note number of A4
pub const A4_MIDI_NOTE: i32 = 69;

/// Convert a frequency to the nearest MIDI-like note number.
///
/// Returns `None` for non-finite input and for zero. Negative or other
/// non-positive frequencies have no logarithm and also yield `None`.
pub fn frequency_to_midi(frequency: f32) -> Option<i32> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return None;
    }

    let semitones = 12.0 * (f64::from(frequency) / f64::from(A4_FREQUENCY_HZ)).log2();
    // Halves round upwards, so 0.5 semitones below a note snaps to that note.
    let rounded = (semitones + 0.5).floor() as i32;
    Some(rounded + A4_MIDI_NOTE)
}

/// Convert a frequency in Hz to a note name such as `"A4"`.
///
/// Non-finite frequencies and exactly zero produce `"--"`.
pub fn frequency_to_note(frequency: f32) -> String {
    match frequency_to_midi(frequency) {
        Some(note) => midi_note_to_name(note),
        None => NO_NOTE.to_string(),
    }
}

/// Convert a MIDI-like note number to a note name.
///
/// Octave is `floor(m / 12) - 1` and the pitch class index is the
/// non-negative remainder, so the mapping is total over `i32`.
pub fn midi_note_to_name(note: i32) -> String {
    let octave = note.div_euclid(12) - 1;
    let index = note.rem_euclid(12) as usize;
    format!("{}{}", NOTE_NAMES[index], octave)
}

/// Note name for a note number that uses 0 to mean "not measured".
pub fn measured_note_name(note: i32) -> String {
    if note > 0 {
        midi_note_to_name(note)
    } else {
        NO_NOTE.to_string()
    }
}
