use serde::{Deserialize, Serialize};

pub mod music;
pub mod sequence;

pub use sequence::{IntonationMode, SequenceState};

/// Which synthesis backend renders notes.
///
/// Switching is handled by the audio crate; the variant itself is
/// parameter-layer state so the host can persist it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynthMode {
    /// Built-in sine voices, retuned by direct frequency substitution.
    #[default]
    Oscillator,
    /// Sample playback, retuned through a pitch-bend offset.
    Sampler,
}

impl SynthMode {
    pub const ALL: [SynthMode; 2] = [SynthMode::Oscillator, SynthMode::Sampler];

    pub fn name(&self) -> &'static str {
        match self {
            SynthMode::Oscillator => "Oscillator",
            SynthMode::Sampler => "Sampler",
        }
    }
}
