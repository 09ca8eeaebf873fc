//! Note display helpers for the GUI and parameter layer.

/// Pitch-class names, sharps only — the spelling the measure-root choices
/// use.
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Name of a MIDI note's pitch class ("C", "F#", ...).
pub fn pitch_class_name(midi: u8) -> &'static str {
    PITCH_CLASS_NAMES[(midi % 12) as usize]
}

/// Display name with octave, middle C (MIDI 60) = "C4".
pub fn note_name(midi: u8) -> String {
    format!("{}{}", pitch_class_name(midi), (midi / 12) as i32 - 1)
}
