//! Tuning math: just-intonation frequency derivation over a measure
//! sequence.
//!
//! All math lives here as pure functions over a [`TuningContext`] — the
//! real-time crate owns the mutable state and builds a context from it each
//! block.

pub mod ratios;

use crate::state::sequence::{IntonationMode, DEFAULT_ROOT, MAX_SEQUENCE_LENGTH};
use ratios::JUST_RATIOS;

/// Concert pitch for A4 (MIDI 69) in twelve-tone equal temperament.
pub const CONCERT_A_HZ: f64 = 440.0;

/// Dense MIDI-note-to-frequency table, index = note number.
pub type FrequencyMap = [f64; 128];

/// Root frequency carried over from the final measure of the previous loop
/// pass. Only meaningful in Shift mode; `frequency_hz` is ignored while
/// `has_drift` is false.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriftState {
    pub has_drift: bool,
    pub frequency_hz: f64,
}

impl DriftState {
    pub fn clear(&mut self) {
        *self = DriftState::default();
    }
}

/// Everything the frequency derivation needs for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct TuningContext {
    pub mode: IntonationMode,
    /// Measures per loop, 4..=16.
    pub length: usize,
    pub roots: [u8; MAX_SEQUENCE_LENGTH],
    pub drift: DriftState,
    /// 12-TET anchor frequency for A4, normally 440.
    pub tuning_a4: f64,
}

impl Default for TuningContext {
    fn default() -> Self {
        Self {
            mode: IntonationMode::Set,
            length: 4,
            roots: [DEFAULT_ROOT; MAX_SEQUENCE_LENGTH],
            drift: DriftState::default(),
            tuning_a4: CONCERT_A_HZ,
        }
    }
}

impl TuningContext {
    fn root(&self, measure: usize) -> u8 {
        self.roots.get(measure).copied().unwrap_or(DEFAULT_ROOT)
    }

    fn last_root(&self) -> u8 {
        self.root(self.length.saturating_sub(1))
    }
}

/// Standard 12-TET formula.
pub fn et_freq(pitch: u8, tuning_a4: f64) -> f64 {
    tuning_a4 * 2.0_f64.powf((pitch as f64 - 69.0) / 12.0)
}

/// 12-TET frequencies for every MIDI note. Used as the map's initial value
/// so notes started before the first block update still sound in tune.
pub fn et_frequencies(tuning_a4: f64) -> FrequencyMap {
    let mut map = [0.0; 128];
    for (note, slot) in map.iter_mut().enumerate() {
        *slot = et_freq(note as u8, tuning_a4);
    }
    map
}

/// Frequency of `note` inside the just scale built on `scale_root`, whose
/// root sounds at `scale_root_freq`.
///
/// The semitone distance is split with floored division so notes below the
/// root land on the right interval: -1 semitone is the major seventh one
/// octave down, not an out-of-range index.
pub fn frequency_in_scale(note: i32, scale_root: i32, scale_root_freq: f64) -> f64 {
    let distance = note - scale_root;
    let octaves = distance.div_euclid(12);
    let interval = distance.rem_euclid(12) as usize;
    scale_root_freq * JUST_RATIOS[interval] * 2.0_f64.powi(octaves)
}

/// Root frequency of a measure.
///
/// Set mode anchors measure 0 at its root's 12-TET pitch and tunes every
/// other measure inside measure 0's scale. Shift mode chains each measure
/// off the previous one, starting from either the 12-TET anchor or, once a
/// loop has wrapped, the drift frequency carried over from the previous
/// pass's final measure.
pub fn root_frequency(measure: usize, ctx: &TuningContext) -> f64 {
    match ctx.mode {
        IntonationMode::Set => {
            let anchor = ctx.root(0);
            let anchor_freq = et_freq(anchor, ctx.tuning_a4);
            if measure == 0 {
                anchor_freq
            } else {
                frequency_in_scale(ctx.root(measure) as i32, anchor as i32, anchor_freq)
            }
        }
        IntonationMode::Shift => {
            let first = ctx.root(0);
            let mut freq = if ctx.drift.has_drift {
                frequency_in_scale(first as i32, ctx.last_root() as i32, ctx.drift.frequency_hz)
            } else {
                et_freq(first, ctx.tuning_a4)
            };
            // Walk the chain forward from the anchor; bounded by the loop
            // length, so at most 15 steps.
            for m in 1..=measure {
                freq = frequency_in_scale(ctx.root(m) as i32, ctx.root(m - 1) as i32, freq);
            }
            freq
        }
    }
}

/// Frequency of a MIDI note inside the given measure's scale.
pub fn note_frequency(note: u8, measure: usize, ctx: &TuningContext) -> f64 {
    let root = ctx.root(measure);
    frequency_in_scale(note as i32, root as i32, root_frequency(measure, ctx))
}

/// The full 128-entry frequency map for one measure. The root frequency is
/// derived once and reused for every note.
pub fn note_frequencies(measure: usize, ctx: &TuningContext) -> FrequencyMap {
    let root = ctx.root(measure) as i32;
    let root_freq = root_frequency(measure, ctx);
    let mut map = [0.0; 128];
    for (note, slot) in map.iter_mut().enumerate() {
        *slot = frequency_in_scale(note as i32, root, root_freq);
    }
    map
}
