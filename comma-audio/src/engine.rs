//! The real-time tuning engine.
//!
//! Owns the sequence configuration, the drift state, the transport tracker,
//! and the synthesizer, and runs the per-block protocol: consume the host
//! transport snapshot, capture or clear drift, rebuild the 128-entry
//! frequency map, and hand it to the synth so sounding voices follow the
//! tuning as playback moves through the sequence.

use std::path::Path;

use comma_types::{
    et_frequencies, note_frequencies, root_frequency, DriftState, FrequencyMap, IntonationMode,
    SequenceState, SynthMode, TuningContext, CONCERT_A_HZ,
};

use crate::synth::Synth;
use crate::transport::{TransportInfo, TransportTracker};

/// A note event with its offset into the current block, already parsed from
/// whatever wire format the host speaks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// Sample offset from the start of the block.
    pub offset: usize,
    pub kind: NoteEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEventKind {
    On {
        channel: u8,
        note: u8,
        velocity: f32,
    },
    Off {
        channel: u8,
        note: u8,
    },
    AllOff,
}

/// Sequence state + drift + transport + synth, driven once per audio block.
#[derive(Debug)]
pub struct AudioEngine {
    seq: SequenceState,
    drift: DriftState,
    tracker: TransportTracker,
    freq_map: FrequencyMap,
    synth: Synth,
    tuning_a4: f64,
}

impl AudioEngine {
    pub fn new() -> Self {
        Self {
            seq: SequenceState::new(),
            drift: DriftState::default(),
            tracker: TransportTracker::new(),
            freq_map: et_frequencies(CONCERT_A_HZ),
            synth: Synth::new(),
            tuning_a4: CONCERT_A_HZ,
        }
    }

    /// Host prepare hook: wires the sample rate and runs the initial map
    /// computation so the first block starts in tune.
    pub fn prepare(&mut self, sample_rate: f64) {
        self.synth.set_sample_rate(sample_rate);
        self.update_frequency_map();
    }

    fn context(&self) -> TuningContext {
        TuningContext {
            mode: self.seq.mode(),
            length: self.seq.length(),
            roots: self.seq.roots(),
            drift: self.drift,
            tuning_a4: self.tuning_a4,
        }
    }

    // --- per-block protocol -------------------------------------------------

    /// Run the block-start update: transport, drift, frequency map. Call at
    /// the top of every audio callback, before any rendering.
    pub fn begin_block(&mut self, transport: &TransportInfo) {
        let delta = self.tracker.update(transport, self.seq.length());
        if delta.stopped {
            log::debug!(target: "audio::transport", "transport stopped, drift cleared");
            self.drift.clear();
        }
        if delta.wrapped && self.seq.mode() == IntonationMode::Shift {
            self.capture_drift();
        }
        self.update_frequency_map();
    }

    /// Store the final measure's root frequency as the next pass's anchor.
    /// Evaluated with the roots current at wrap detection, chaining through
    /// any existing drift base, before the stored drift is overwritten.
    fn capture_drift(&mut self) {
        let last = self.seq.length() - 1;
        let frequency_hz = root_frequency(last, &self.context());
        self.drift = DriftState {
            has_drift: true,
            frequency_hz,
        };
        log::debug!(
            target: "audio::tuning",
            "drift captured: measure {} root at {:.3} Hz",
            last,
            frequency_hz
        );
    }

    /// Rebuild the whole map for the current measure and hand it to the
    /// synth, which retunes sounding voices. Full recomputation every time:
    /// 128 closed-form evaluations off a chain bounded by the loop length.
    fn update_frequency_map(&mut self) {
        self.freq_map = note_frequencies(self.tracker.current_measure(), &self.context());
        self.synth.apply_frequency_map(&self.freq_map);
    }

    /// Render one block, splitting at each event offset so notes start and
    /// stop sample-accurately.
    pub fn render(&mut self, events: &[NoteEvent], out: &mut [f32]) {
        let mut pos = 0;
        for event in events {
            let offset = event.offset.min(out.len());
            if offset > pos {
                self.synth.render(&mut out[pos..offset]);
                pos = offset;
            }
            match event.kind {
                NoteEventKind::On {
                    channel,
                    note,
                    velocity,
                } => self.synth.note_on(channel, note, velocity),
                NoteEventKind::Off { channel, note } => self.synth.note_off(channel, note),
                NoteEventKind::AllOff => self.synth.all_notes_off(),
            }
        }
        if pos < out.len() {
            self.synth.render(&mut out[pos..]);
        }
    }

    pub fn note_on(&mut self, channel: u8, note: u8, velocity: f32) {
        self.synth.note_on(channel, note, velocity);
    }

    pub fn note_off(&mut self, channel: u8, note: u8) {
        self.synth.note_off(channel, note);
    }

    pub fn all_notes_off(&mut self) {
        self.synth.all_notes_off();
    }

    // --- parameter surface ---------------------------------------------------

    /// Set the loop length. Invalid values are ignored; an accepted change
    /// invalidates drift and the tracker's wrap memory.
    pub fn set_sequence_length(&mut self, length: usize) {
        if self.seq.set_length(length) {
            self.drift.clear();
            self.tracker.clear_wrap_memory();
            self.update_frequency_map();
        }
    }

    pub fn sequence_length(&self) -> usize {
        self.seq.length()
    }

    /// Set the intonation mode. Leaving Shift discards accumulated drift.
    pub fn set_intonation_mode(&mut self, mode: IntonationMode) {
        let previous = self.seq.set_mode(mode);
        if previous == IntonationMode::Shift && mode == IntonationMode::Set {
            self.drift.clear();
        }
        if previous != mode {
            log::debug!(target: "audio::tuning", "intonation mode set to {}", mode.name());
        }
        self.update_frequency_map();
    }

    pub fn intonation_mode(&self) -> IntonationMode {
        self.seq.mode()
    }

    pub fn set_measure_root(&mut self, measure: usize, note: u8) {
        if self.seq.set_root(measure, note) {
            self.update_frequency_map();
        }
    }

    pub fn measure_root(&self, measure: usize) -> u8 {
        self.seq.root(measure)
    }

    /// Discard accumulated Shift-mode drift; measure 0 reverts to the 12-TET
    /// anchor until the next wrap.
    pub fn reset_drift(&mut self) {
        self.drift.clear();
        self.update_frequency_map();
    }

    pub fn has_drift(&self) -> bool {
        self.drift.has_drift
    }

    pub fn set_tuning_a4(&mut self, hz: f64) {
        if hz > 0.0 {
            self.tuning_a4 = hz;
            self.update_frequency_map();
        }
    }

    pub fn tuning_a4(&self) -> f64 {
        self.tuning_a4
    }

    // --- display queries -----------------------------------------------------

    pub fn current_measure(&self) -> usize {
        self.tracker.current_measure()
    }

    pub fn current_root(&self) -> u8 {
        self.seq.root(self.tracker.current_measure())
    }

    /// Frequency the given note sounds at in the current measure.
    pub fn frequency_for_note(&self, note: u8) -> f64 {
        self.freq_map[(note as usize).min(127)]
    }

    // --- synth facade --------------------------------------------------------

    pub fn set_synth_mode(&mut self, mode: SynthMode) {
        self.synth.set_mode(mode);
    }

    pub fn synth_mode(&self) -> SynthMode {
        self.synth.mode()
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.synth.set_gain(gain);
    }

    pub fn gain(&self) -> f32 {
        self.synth.gain()
    }

    pub fn set_max_polyphony(&mut self, voices: usize) {
        self.synth.set_max_polyphony(voices);
    }

    pub fn active_voices(&self) -> usize {
        self.synth.active_voices()
    }

    pub fn load_bank(&mut self, path: &Path) -> Result<(), String> {
        self.synth.load_bank(path)
    }

    pub fn unload_bank(&mut self) {
        self.synth.unload_bank();
    }

    pub fn is_bank_loaded(&self) -> bool {
        self.synth.is_bank_loaded()
    }

    pub fn bank_name(&self) -> Option<&str> {
        self.synth.bank_name()
    }

    pub fn bank_path(&self) -> Option<&Path> {
        self.synth.bank_path()
    }

    pub fn preset_count(&self) -> usize {
        self.synth.preset_count()
    }

    pub fn preset_name(&self, index: usize) -> Option<&str> {
        self.synth.preset_name(index)
    }

    pub fn select_preset(&mut self, index: usize) -> bool {
        self.synth.select_preset(index)
    }

    pub fn current_preset(&self) -> usize {
        self.synth.current_preset()
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comma_types::{et_freq, frequency_in_scale};

    fn playing(beats: f64) -> TransportInfo {
        TransportInfo {
            beats: Some(beats),
            bpm: 120.0,
            playing: true,
        }
    }

    /// Engine in Shift mode walking roots C-D-E-G, prepared at 44.1 kHz.
    fn shift_engine() -> AudioEngine {
        let mut engine = AudioEngine::new();
        engine.prepare(44100.0);
        engine.set_intonation_mode(IntonationMode::Shift);
        for (measure, root) in [60u8, 62, 64, 67].iter().enumerate() {
            engine.set_measure_root(measure, *root);
        }
        engine
    }

    /// Drive one full 4-measure loop so a wrap is detected.
    fn run_one_loop(engine: &mut AudioEngine) {
        for beats in [0.0, 4.0, 8.0, 12.0, 13.0, 16.0] {
            engine.begin_block(&playing(beats));
        }
    }

    #[test]
    fn set_mode_measure_zero_is_et() {
        let mut engine = AudioEngine::new();
        engine.prepare(44100.0);
        engine.set_measure_root(0, 69);
        engine.begin_block(&playing(0.0));
        assert!((engine.frequency_for_note(69) - 440.0).abs() < 1e-9);
    }

    #[test]
    fn map_follows_the_measure() {
        let mut engine = AudioEngine::new();
        engine.prepare(44100.0);
        engine.set_measure_root(1, 67);
        engine.begin_block(&playing(0.0));
        // F is one of the notes whose just tuning differs between a C-rooted
        // and a G-rooted scale (shared tones like C and E do not move).
        let m0_f = engine.frequency_for_note(65);
        engine.begin_block(&playing(4.0));
        assert_eq!(engine.current_measure(), 1);
        assert_eq!(engine.current_root(), 67);
        let m1_f = engine.frequency_for_note(65);
        assert!(
            (m0_f - m1_f).abs() > 0.5,
            "the same note retunes across measures: {} vs {}",
            m0_f,
            m1_f
        );
    }

    #[test]
    fn wrap_captures_drift_in_shift_mode() {
        let mut engine = shift_engine();
        for beats in [0.0, 4.0, 8.0, 12.0, 13.0] {
            engine.begin_block(&playing(beats));
        }
        // Final measure's root frequency as derived before the wrap.
        let final_root = root_frequency(3, &engine.context());
        engine.begin_block(&playing(16.0));
        assert!(engine.has_drift());
        // The new measure 0 anchors on the previous pass's final root.
        let expected = frequency_in_scale(60, 67, final_root);
        assert!((engine.frequency_for_note(60) - expected).abs() < 1e-6);
        assert!(
            (engine.frequency_for_note(60) - et_freq(60, CONCERT_A_HZ)).abs() > 0.1,
            "drifted measure 0 must leave 12-TET"
        );
    }

    #[test]
    fn wrap_in_set_mode_leaves_no_drift() {
        let mut engine = shift_engine();
        engine.set_intonation_mode(IntonationMode::Set);
        run_one_loop(&mut engine);
        assert!(!engine.has_drift());
    }

    #[test]
    fn second_wrap_chains_from_the_first() {
        let mut engine = shift_engine();
        run_one_loop(&mut engine);
        let first_drift_c = engine.frequency_for_note(60);
        for beats in [20.0, 24.0, 28.0, 29.0, 32.0] {
            engine.begin_block(&playing(beats));
        }
        assert!(engine.has_drift());
        let second_drift_c = engine.frequency_for_note(60);
        assert!(
            (second_drift_c - first_drift_c).abs() > 0.1,
            "each pass keeps drifting: {} vs {}",
            first_drift_c,
            second_drift_c
        );
    }

    #[test]
    fn transport_stop_clears_drift() {
        let mut engine = shift_engine();
        run_one_loop(&mut engine);
        assert!(engine.has_drift());
        engine.begin_block(&TransportInfo {
            beats: Some(16.0),
            bpm: 120.0,
            playing: false,
        });
        assert!(!engine.has_drift());
        assert_eq!(engine.current_measure(), 0);
        assert!((engine.frequency_for_note(60) - et_freq(60, CONCERT_A_HZ)).abs() < 1e-9);
    }

    #[test]
    fn length_change_clears_drift() {
        let mut engine = shift_engine();
        run_one_loop(&mut engine);
        assert!(engine.has_drift());
        engine.set_sequence_length(8);
        assert!(!engine.has_drift());
    }

    #[test]
    fn invalid_length_change_changes_nothing() {
        let mut engine = shift_engine();
        run_one_loop(&mut engine);
        engine.set_sequence_length(5);
        assert_eq!(engine.sequence_length(), 4);
        assert!(engine.has_drift(), "a rejected setter must not clear drift");
    }

    #[test]
    fn mode_round_trip_resets_drift() {
        let mut engine = shift_engine();
        run_one_loop(&mut engine);
        assert!(engine.has_drift());
        engine.set_intonation_mode(IntonationMode::Set);
        engine.set_intonation_mode(IntonationMode::Shift);
        assert!(!engine.has_drift(), "Shift→Set→Shift starts drift-free");
    }

    #[test]
    fn explicit_reset_reverts_measure_zero_to_et() {
        let mut engine = shift_engine();
        run_one_loop(&mut engine);
        engine.reset_drift();
        assert!(!engine.has_drift());
        assert!((engine.frequency_for_note(60) - et_freq(60, CONCERT_A_HZ)).abs() < 1e-9);
    }

    #[test]
    fn root_change_rebuilds_map_immediately() {
        let mut engine = AudioEngine::new();
        engine.prepare(44100.0);
        engine.begin_block(&playing(4.0));
        let before = engine.frequency_for_note(65);
        engine.set_measure_root(1, 67);
        assert!((engine.frequency_for_note(65) - before).abs() > 0.5);
    }

    #[test]
    fn out_of_range_measure_root_reads_default() {
        let engine = AudioEngine::new();
        assert_eq!(engine.measure_root(99), 60);
    }

    #[test]
    fn concert_pitch_moves_the_anchor() {
        let mut engine = AudioEngine::new();
        engine.prepare(44100.0);
        engine.set_measure_root(0, 69);
        engine.set_tuning_a4(432.0);
        engine.begin_block(&playing(0.0));
        assert!((engine.frequency_for_note(69) - 432.0).abs() < 1e-9);
        engine.set_tuning_a4(0.0);
        assert!((engine.tuning_a4() - 432.0).abs() < 1e-12, "invalid pitch ignored");
    }

    #[test]
    fn render_splits_at_event_offsets() {
        let mut engine = AudioEngine::new();
        engine.prepare(44100.0);
        engine.begin_block(&playing(0.0));
        let events = [
            NoteEvent {
                offset: 128,
                kind: NoteEventKind::On {
                    channel: 0,
                    note: 69,
                    velocity: 1.0,
                },
            },
            NoteEvent {
                offset: 256,
                kind: NoteEventKind::AllOff,
            },
        ];
        let mut out = vec![0.0f32; 512];
        engine.render(&events, &mut out);
        let pre = out[..128].iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let mid = out[128..256].iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let post = out[300..].iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert_eq!(pre, 0.0, "silence before the note-on offset");
        assert!(mid > 0.0, "audio between note-on and all-off");
        assert_eq!(post, 0.0, "silence after all-off");
    }

    #[test]
    fn voices_follow_a_measure_change() {
        let mut engine = AudioEngine::new();
        engine.prepare(44100.0);
        engine.set_measure_root(1, 67);
        engine.begin_block(&playing(0.0));
        engine.note_on(0, 65, 1.0);
        let started_at = engine.frequency_for_note(65);
        engine.begin_block(&playing(4.0));
        let retuned_to = engine.frequency_for_note(65);
        assert!((started_at - retuned_to).abs() > 0.5);
        // One voice still sounding, now aimed at the new frequency.
        assert_eq!(engine.active_voices(), 1);
    }
}
