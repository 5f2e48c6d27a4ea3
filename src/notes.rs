//! Note names, MIDI numbers, and equal-tempered frequencies.
//!
//! The engine itself is name-agnostic (a note id is opaque); this module is
//! the glue that turns "C4" or "Eb3" into a pitch for callers that work in
//! note names. A4 = 440 Hz = MIDI note 69.

/// Convert a MIDI note number to its equal-tempered frequency in Hz.
#[inline]
pub fn midi_to_frequency(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Parse a note name ("C4", "F#2", "Eb3") into a MIDI note number.
///
/// Accepts letters A-G, an optional `#` or `b`, and an octave in the MIDI
/// range (C-1 = 0 through G9 = 127). Returns `None` for anything else.
pub fn midi(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    let mut semitone: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let octave_str = match rest.chars().next() {
        Some('#') => {
            semitone += 1;
            &rest[1..]
        }
        Some('b') => {
            semitone -= 1;
            &rest[1..]
        }
        _ => rest,
    };

    let octave: i32 = octave_str.parse().ok()?;
    let number = 12 * (octave + 1) + semitone;
    u8::try_from(number).ok().filter(|&n| n <= 127)
}

/// Parse a note name straight to its frequency in Hz.
pub fn frequency(name: &str) -> Option<f32> {
    midi(name).map(midi_to_frequency)
}
