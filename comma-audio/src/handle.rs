//! Shared engine handle.
//!
//! One mutex around the whole engine serializes control-surface mutation
//! (bank loads, sequence edits, preset changes) against the audio callback.
//! The state is small and control writes are rare next to the block rate,
//! so a single coarse lock is enough.

use std::sync::{Arc, Mutex};

use crate::engine::{AudioEngine, NoteEvent};
use crate::transport::TransportInfo;

/// Cloneable handle to an engine shared between the audio callback and any
/// control threads.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Mutex<AudioEngine>>,
}

impl EngineHandle {
    pub fn new(engine: AudioEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run a closure against the locked engine. Returns `None` only if a
    /// previous holder panicked.
    pub fn with<R>(&self, f: impl FnOnce(&mut AudioEngine) -> R) -> Option<R> {
        match self.inner.lock() {
            Ok(mut engine) => Some(f(&mut engine)),
            Err(_) => None,
        }
    }

    /// The whole audio callback in one lock scope: block-start update, then
    /// event-interleaved rendering.
    pub fn process_block(
        &self,
        transport: &TransportInfo,
        events: &[NoteEvent],
        out: &mut [f32],
    ) {
        self.with(|engine| {
            engine.begin_block(transport);
            engine.render(events, out);
        });
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new(AudioEngine::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NoteEventKind;
    use std::thread;

    #[test]
    fn with_exposes_the_engine() {
        let handle = EngineHandle::default();
        let length = handle.with(|engine| engine.sequence_length());
        assert_eq!(length, Some(4));
    }

    #[test]
    fn process_block_renders_under_the_lock() {
        let handle = EngineHandle::default();
        handle.with(|engine| engine.prepare(44100.0));
        let events = [NoteEvent {
            offset: 0,
            kind: NoteEventKind::On {
                channel: 0,
                note: 69,
                velocity: 1.0,
            },
        }];
        let mut out = vec![0.0f32; 512];
        handle.process_block(&TransportInfo::default(), &events, &mut out);
        let peak = out.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.0);
    }

    #[test]
    fn control_thread_mutation_is_serialized() {
        let handle = EngineHandle::default();
        handle.with(|engine| engine.prepare(44100.0));

        let control = handle.clone();
        let writer = thread::spawn(move || {
            for _ in 0..50 {
                control.with(|engine| {
                    engine.set_sequence_length(8);
                    engine.set_measure_root(2, 64);
                    engine.set_sequence_length(4);
                });
            }
        });

        let mut out = vec![0.0f32; 256];
        for _ in 0..50 {
            handle.process_block(&TransportInfo::default(), &[], &mut out);
        }
        writer.join().unwrap();

        let length = handle.with(|engine| engine.sequence_length()).unwrap();
        assert!(length == 4 || length == 8);
    }
}
