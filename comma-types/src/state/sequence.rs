//! Sequence configuration: loop length, intonation mode, per-measure roots.
//!
//! This is the parameter-layer state the host persists as an opaque blob;
//! the core never serializes it itself.

use serde::{Deserialize, Serialize};

/// Maximum measures per loop. Roots beyond the active length stay settable
/// but inert until the length grows to cover them.
pub const MAX_SEQUENCE_LENGTH: usize = 16;

/// The loop lengths the sequence accepts.
pub const SEQUENCE_LENGTHS: [usize; 4] = [4, 8, 12, 16];

/// Default measure root: middle C.
pub const DEFAULT_ROOT: u8 = 60;

/// How each measure's scale root relates to the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntonationMode {
    /// Every measure is tuned inside measure 0's scale.
    #[default]
    Set,
    /// Every measure is tuned inside the previous measure's scale, and a
    /// loop wrap carries the final root frequency over as drift.
    Shift,
}

impl IntonationMode {
    pub const ALL: [IntonationMode; 2] = [IntonationMode::Set, IntonationMode::Shift];

    pub fn name(&self) -> &'static str {
        match self {
            IntonationMode::Set => "Set",
            IntonationMode::Shift => "Shift",
        }
    }
}

/// Loop length, mode, and the root note of every measure slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceState {
    length: usize,
    mode: IntonationMode,
    roots: [u8; MAX_SEQUENCE_LENGTH],
}

impl Default for SequenceState {
    fn default() -> Self {
        Self {
            length: SEQUENCE_LENGTHS[0],
            mode: IntonationMode::Set,
            roots: [DEFAULT_ROOT; MAX_SEQUENCE_LENGTH],
        }
    }
}

impl SequenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Set the loop length. Values outside [`SEQUENCE_LENGTHS`] are ignored.
    /// Returns true when the stored length actually changed, so the caller
    /// can invalidate drift state.
    pub fn set_length(&mut self, length: usize) -> bool {
        if !SEQUENCE_LENGTHS.contains(&length) || length == self.length {
            return false;
        }
        self.length = length;
        true
    }

    pub fn mode(&self) -> IntonationMode {
        self.mode
    }

    /// Set the intonation mode, returning the previous one so the caller can
    /// detect a Shift→Set transition.
    pub fn set_mode(&mut self, mode: IntonationMode) -> IntonationMode {
        std::mem::replace(&mut self.mode, mode)
    }

    /// Root note for a measure slot. Out-of-range indices read as the
    /// default root rather than failing.
    pub fn root(&self, measure: usize) -> u8 {
        self.roots.get(measure).copied().unwrap_or(DEFAULT_ROOT)
    }

    /// Set a measure slot's root note. Out-of-range indices are ignored.
    /// Returns true when a slot was written.
    pub fn set_root(&mut self, measure: usize, note: u8) -> bool {
        match self.roots.get_mut(measure) {
            Some(slot) => {
                *slot = note;
                true
            }
            None => false,
        }
    }

    pub fn roots(&self) -> [u8; MAX_SEQUENCE_LENGTH] {
        self.roots
    }
}
