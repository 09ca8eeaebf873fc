//! Voices: one sounding note each, retunable while active.
//!
//! The two voice kinds share one interface through the [`Voice`] enum:
//! `set_frequency`, `is_active`, `current_note`. An oscillator voice takes
//! any frequency directly; a sample voice can only be steered through a
//! pitch-bend offset from its 12-TET playback rate.

use super::bank::SamplePreset;
use super::{pitch_bend_for_frequency, BEND_RANGE_SEMITONES};

/// Default envelope ramps. 5 ms onset is the minimum that avoids clicks.
pub const ATTACK_SECS: f64 = 0.005;
pub const RELEASE_SECS: f64 = 0.050;

const TAU: f64 = std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvStage {
    Attack,
    Sustain,
    Release,
    Idle,
}

/// A sine voice with a linear attack/release envelope. Retuning replaces
/// the frequency without touching the phase accumulator, so there is no
/// discontinuity in the output.
#[derive(Debug)]
pub struct OscillatorVoice {
    note: u8,
    channel: u8,
    level: f64,
    frequency: f64,
    phase: f64,
    env: f64,
    stage: EnvStage,
    attack_secs: f64,
    release_secs: f64,
}

impl OscillatorVoice {
    pub fn start(note: u8, channel: u8, velocity: f32, frequency: f64) -> Self {
        Self {
            note,
            channel,
            level: velocity as f64 * 0.15,
            frequency,
            phase: 0.0,
            env: 0.0,
            stage: EnvStage::Attack,
            attack_secs: ATTACK_SECS,
            release_secs: RELEASE_SECS,
        }
    }

    /// Override the envelope ramp times.
    pub fn set_envelope(&mut self, attack_secs: f64, release_secs: f64) {
        self.attack_secs = attack_secs.max(f64::EPSILON);
        self.release_secs = release_secs.max(f64::EPSILON);
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn set_frequency(&mut self, hz: f64) {
        self.frequency = hz;
    }

    pub fn release(&mut self) {
        if self.stage != EnvStage::Idle {
            self.stage = EnvStage::Release;
        }
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvStage::Idle
    }

    pub fn render(&mut self, out: &mut [f32], sample_rate: f64, gain: f32) {
        if !self.is_active() {
            return;
        }
        let attack_step = 1.0 / (self.attack_secs * sample_rate);
        let release_step = 1.0 / (self.release_secs * sample_rate);

        for sample in out.iter_mut() {
            match self.stage {
                EnvStage::Attack => {
                    self.env += attack_step;
                    if self.env >= 1.0 {
                        self.env = 1.0;
                        self.stage = EnvStage::Sustain;
                    }
                }
                EnvStage::Release => {
                    self.env -= release_step;
                    if self.env <= 0.0 {
                        self.env = 0.0;
                        self.stage = EnvStage::Idle;
                        return;
                    }
                }
                EnvStage::Sustain => {}
                EnvStage::Idle => return,
            }

            *sample += ((self.phase * TAU).sin() * self.level * self.env) as f32 * gain;

            self.phase += self.frequency / sample_rate;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
    }
}

/// A sample-playback voice. The playback rate combines the 12-TET interval
/// from the preset's root key with a pitch-bend offset; retuning adjusts
/// only the bend, never restarting the sample.
#[derive(Debug)]
pub struct SampleVoice {
    note: u8,
    channel: u8,
    level: f64,
    preset: SamplePreset,
    position: f64,
    /// Normalized bend in [-1, 1]; ±1 spans the full ±2 semitone window.
    bend: f64,
    target_frequency: f64,
    env: f64,
    stage: EnvStage,
}

impl SampleVoice {
    pub fn start(
        note: u8,
        channel: u8,
        velocity: f32,
        target_frequency: f64,
        preset: SamplePreset,
    ) -> Self {
        Self {
            note,
            channel,
            level: velocity as f64,
            bend: pitch_bend_for_frequency(note, target_frequency),
            target_frequency,
            preset,
            position: 0.0,
            env: 0.0,
            stage: EnvStage::Attack,
        }
    }

    pub fn bend(&self) -> f64 {
        self.bend
    }

    pub fn target_frequency(&self) -> f64 {
        self.target_frequency
    }

    /// Re-aim the voice at a new target frequency: recompute the bend from
    /// the note's 12-TET reference and keep playing from the current
    /// position.
    pub fn set_frequency(&mut self, hz: f64) {
        self.target_frequency = hz;
        self.bend = pitch_bend_for_frequency(self.note, hz);
    }

    pub fn release(&mut self) {
        if self.stage != EnvStage::Idle {
            self.stage = EnvStage::Release;
        }
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvStage::Idle
    }

    fn rate(&self, sample_rate: f64) -> f64 {
        let semitones = (self.note as f64 - self.preset.root_key() as f64)
            + self.bend * BEND_RANGE_SEMITONES;
        (self.preset.sample_rate() as f64 / sample_rate) * 2.0_f64.powf(semitones / 12.0)
    }

    pub fn render(&mut self, out: &mut [f32], sample_rate: f64, gain: f32) {
        if !self.is_active() {
            return;
        }
        let frames = self.preset.frames();
        let rate = self.rate(sample_rate);
        let attack_step = 1.0 / (ATTACK_SECS * sample_rate);
        let release_step = 1.0 / (RELEASE_SECS * sample_rate);

        for sample in out.iter_mut() {
            let index = self.position as usize;
            if index + 1 >= frames.len() {
                self.stage = EnvStage::Idle;
                return;
            }

            match self.stage {
                EnvStage::Attack => {
                    self.env += attack_step;
                    if self.env >= 1.0 {
                        self.env = 1.0;
                        self.stage = EnvStage::Sustain;
                    }
                }
                EnvStage::Release => {
                    self.env -= release_step;
                    if self.env <= 0.0 {
                        self.env = 0.0;
                        self.stage = EnvStage::Idle;
                        return;
                    }
                }
                EnvStage::Sustain => {}
                EnvStage::Idle => return,
            }

            let frac = self.position - index as f64;
            let value =
                frames[index] as f64 * (1.0 - frac) + frames[index + 1] as f64 * frac;
            *sample += (value * self.level * self.env) as f32 * gain;

            self.position += rate;
        }
    }
}

/// Tagged union over the two voice kinds, exposing the shared active-note
/// interface.
#[derive(Debug)]
pub enum Voice {
    Oscillator(OscillatorVoice),
    Sample(SampleVoice),
}

impl Voice {
    pub fn is_active(&self) -> bool {
        match self {
            Voice::Oscillator(v) => v.is_active(),
            Voice::Sample(v) => v.is_active(),
        }
    }

    pub fn current_note(&self) -> u8 {
        match self {
            Voice::Oscillator(v) => v.note,
            Voice::Sample(v) => v.note,
        }
    }

    pub fn channel(&self) -> u8 {
        match self {
            Voice::Oscillator(v) => v.channel,
            Voice::Sample(v) => v.channel,
        }
    }

    /// The frequency the voice is currently aimed at.
    pub fn target_frequency(&self) -> f64 {
        match self {
            Voice::Oscillator(v) => v.frequency(),
            Voice::Sample(v) => v.target_frequency(),
        }
    }

    /// Steer the voice to a new frequency: direct substitution for an
    /// oscillator, a recomputed pitch bend for a sample.
    pub fn set_frequency(&mut self, hz: f64) {
        match self {
            Voice::Oscillator(v) => v.set_frequency(hz),
            Voice::Sample(v) => v.set_frequency(hz),
        }
    }

    pub fn release(&mut self) {
        match self {
            Voice::Oscillator(v) => v.release(),
            Voice::Sample(v) => v.release(),
        }
    }

    pub fn render(&mut self, out: &mut [f32], sample_rate: f64, gain: f32) {
        match self {
            Voice::Oscillator(v) => v.render(out, sample_rate, gain),
            Voice::Sample(v) => v.render(out, sample_rate, gain),
        }
    }
}
