//! # comma-types
//!
//! Shared type definitions and tuning math for the Comma engine.
//!
//! Everything here is pure data and arithmetic — no I/O, no logging, no
//! audio dependencies — so the real-time crate and any host shell can share
//! these types freely. The name comes from the musical comma: the small
//! interval a chain of just intervals drifts away from equal temperament.

pub mod state;
pub mod tuning;

pub use state::music::{note_name, pitch_class_name};
pub use state::sequence::{
    IntonationMode, SequenceState, DEFAULT_ROOT, MAX_SEQUENCE_LENGTH, SEQUENCE_LENGTHS,
};
pub use state::SynthMode;
pub use tuning::ratios::{RatioTable, JUST_RATIOS};
pub use tuning::{
    et_freq, et_frequencies, frequency_in_scale, note_frequencies, note_frequency,
    root_frequency, DriftState, FrequencyMap, TuningContext, CONCERT_A_HZ,
};
