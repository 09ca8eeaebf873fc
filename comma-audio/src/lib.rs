//! # comma-audio
//!
//! The real-time side of the Comma engine: transport tracking, per-block
//! frequency-map recomputation, and a dual-backend synthesizer whose
//! sounding voices are retuned in place as the map changes.
//!
//! The host audio callback drives everything through [`AudioEngine`] (or the
//! lock-wrapped [`EngineHandle`] when a control surface shares the state):
//! call [`AudioEngine::begin_block`] with the current transport snapshot,
//! then [`AudioEngine::render`] with the block's note events.

pub mod engine;
pub mod handle;
pub mod synth;
pub mod transport;

pub use engine::{AudioEngine, NoteEvent, NoteEventKind};
pub use handle::EngineHandle;
pub use synth::{Synth, BEND_RANGE_SEMITONES, RETUNE_EPSILON_HZ};
pub use transport::{TransportInfo, TransportTracker, BEATS_PER_MEASURE};
