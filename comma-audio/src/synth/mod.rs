//! Dual-backend synthesizer: sine oscillator voices and sample playback,
//! both retunable while sounding.
//!
//! The synth keeps its own copy of the frequency map. Notes started between
//! map updates look their pitch up here; when a new map arrives every
//! sounding voice whose target diverges beyond [`RETUNE_EPSILON_HZ`] is
//! steered to the new frequency without being restarted.

mod bank;
mod voice;

pub use bank::{SampleBank, SamplePreset, DEFAULT_ROOT_KEY};
pub use voice::{OscillatorVoice, SampleVoice, Voice, ATTACK_SECS, RELEASE_SECS};

use std::path::Path;

use comma_types::{et_freq, et_frequencies, FrequencyMap, SynthMode, CONCERT_A_HZ};

/// Pitch-bend range of the sample backend, in semitones either side of the
/// nominal pitch. Tunings that need more than this clip at the window edge.
pub const BEND_RANGE_SEMITONES: f64 = 2.0;

/// Map entries closer than this to a voice's current target leave the voice
/// alone.
pub const RETUNE_EPSILON_HZ: f64 = 0.01;

/// Default polyphony per mode; the sample path affords more voices than the
/// oscillator pool.
pub const OSCILLATOR_POLYPHONY: usize = 16;
pub const SAMPLER_POLYPHONY: usize = 64;

/// Normalized pitch-bend value steering `note` to `target_hz`, clamped to
/// the representable window. The reference is the note's 440-based 12-TET
/// pitch — sample content is recorded at standard pitch regardless of the
/// engine's concert-A setting.
pub fn pitch_bend_for_frequency(note: u8, target_hz: f64) -> f64 {
    let standard = et_freq(note, CONCERT_A_HZ);
    if target_hz <= 0.0 {
        return 0.0;
    }
    let semitones = 12.0 * (target_hz / standard).log2();
    (semitones / BEND_RANGE_SEMITONES).clamp(-1.0, 1.0)
}

/// The voice pool plus whichever backend is active.
#[derive(Debug)]
pub struct Synth {
    mode: SynthMode,
    sample_rate: f64,
    gain: f32,
    max_polyphony: usize,
    voices: Vec<Voice>,
    bank: Option<SampleBank>,
    freq_map: FrequencyMap,
}

impl Synth {
    pub fn new() -> Self {
        Self {
            mode: SynthMode::Oscillator,
            sample_rate: 44100.0,
            gain: 1.0,
            max_polyphony: OSCILLATOR_POLYPHONY,
            voices: Vec::new(),
            bank: None,
            freq_map: et_frequencies(CONCERT_A_HZ),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate.max(1.0);
    }

    pub fn mode(&self) -> SynthMode {
        self.mode
    }

    /// Switch backends. Everything sounding is silenced first so no voice
    /// outlives its backend, and the polyphony cap resets to the new mode's
    /// default.
    pub fn set_mode(&mut self, mode: SynthMode) {
        if mode == self.mode {
            return;
        }
        self.all_notes_off();
        self.mode = mode;
        self.max_polyphony = match mode {
            SynthMode::Oscillator => OSCILLATOR_POLYPHONY,
            SynthMode::Sampler => SAMPLER_POLYPHONY,
        };
        log::info!(target: "audio::synth", "switched to {} mode", mode.name());
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }

    pub fn max_polyphony(&self) -> usize {
        self.max_polyphony
    }

    pub fn set_max_polyphony(&mut self, voices: usize) {
        self.max_polyphony = voices.max(1);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// The frequency a new note would start at under the current map.
    pub fn note_frequency(&self, note: u8) -> f64 {
        self.freq_map[(note as usize).min(127)]
    }

    // --- note lifecycle ---------------------------------------------------

    pub fn note_on(&mut self, channel: u8, note: u8, velocity: f32) {
        let target = self.note_frequency(note);
        let voice = match self.mode {
            SynthMode::Oscillator => {
                Voice::Oscillator(OscillatorVoice::start(note, channel, velocity, target))
            }
            SynthMode::Sampler => {
                let Some(bank) = &self.bank else {
                    // No bank loaded: the note cannot sound.
                    return;
                };
                Voice::Sample(SampleVoice::start(
                    note,
                    channel,
                    velocity,
                    target,
                    bank.current().clone(),
                ))
            }
        };
        self.spawn(voice);
    }

    fn spawn(&mut self, voice: Voice) {
        self.voices.retain(Voice::is_active);
        // Retriggering a sounding note replaces its voice outright.
        self.voices.retain(|v| {
            !(v.current_note() == voice.current_note() && v.channel() == voice.channel())
        });
        while self.voices.len() >= self.max_polyphony {
            // Steal the oldest voice.
            self.voices.remove(0);
        }
        self.voices.push(voice);
    }

    pub fn note_off(&mut self, channel: u8, note: u8) {
        for voice in &mut self.voices {
            if voice.is_active() && voice.current_note() == note && voice.channel() == channel {
                voice.release();
            }
        }
    }

    /// Hard stop: no release tails.
    pub fn all_notes_off(&mut self) {
        self.voices.clear();
    }

    // --- retuning ----------------------------------------------------------

    /// Take a freshly recomputed frequency map and retune every sounding
    /// voice whose target moved more than the epsilon.
    pub fn apply_frequency_map(&mut self, map: &FrequencyMap) {
        self.freq_map = *map;
        for voice in &mut self.voices {
            if !voice.is_active() {
                continue;
            }
            let target = map[voice.current_note() as usize];
            if (voice.target_frequency() - target).abs() > RETUNE_EPSILON_HZ {
                voice.set_frequency(target);
            }
        }
    }

    // --- rendering ----------------------------------------------------------

    /// Mix every active voice into `out` (mono, additive).
    pub fn render(&mut self, out: &mut [f32]) {
        for voice in &mut self.voices {
            voice.render(out, self.sample_rate, self.gain);
        }
        self.voices.retain(Voice::is_active);
    }

    // --- sample bank --------------------------------------------------------

    /// Load a bank, replacing any current one. The previous bank is fully
    /// unloaded first; on failure the synth is left with no bank and in
    /// oscillator mode, never half-loaded.
    pub fn load_bank(&mut self, path: &Path) -> Result<(), String> {
        self.unload_bank();
        let bank = SampleBank::load(path).map_err(|e| {
            log::warn!(target: "audio::bank", "bank load failed: {}", e);
            e
        })?;
        log::info!(
            target: "audio::bank",
            "loaded bank '{}' with {} presets",
            bank.name(),
            bank.preset_count()
        );
        self.bank = Some(bank);
        self.set_mode(SynthMode::Sampler);
        Ok(())
    }

    pub fn unload_bank(&mut self) {
        if let Some(bank) = self.bank.take() {
            self.all_notes_off();
            log::info!(target: "audio::bank", "unloaded bank '{}'", bank.name());
        }
        self.set_mode(SynthMode::Oscillator);
    }

    pub fn is_bank_loaded(&self) -> bool {
        self.bank.is_some()
    }

    pub fn bank_name(&self) -> Option<&str> {
        self.bank.as_ref().map(|b| b.name())
    }

    pub fn bank_path(&self) -> Option<&Path> {
        self.bank.as_ref().map(|b| b.path())
    }

    pub fn preset_count(&self) -> usize {
        self.bank.as_ref().map(|b| b.preset_count()).unwrap_or(0)
    }

    pub fn preset_name(&self, index: usize) -> Option<&str> {
        self.bank.as_ref().and_then(|b| b.preset_name(index))
    }

    pub fn select_preset(&mut self, index: usize) -> bool {
        match self.bank.as_mut() {
            Some(bank) => {
                let selected = bank.select_preset(index);
                if selected {
                    log::info!(
                        target: "audio::bank",
                        "selected preset {}: {}",
                        index,
                        bank.preset_name(index).unwrap_or("")
                    );
                }
                selected
            }
            None => false,
        }
    }

    pub fn current_preset(&self) -> usize {
        self.bank.as_ref().map(|b| b.current_preset()).unwrap_or(0)
    }
}

impl Default for Synth {
    fn default() -> Self {
        Self::new()
    }
}
