//! Host transport tracking: beats position to measure index.

/// Beats per measure; the sequence assumes 4/4 time.
pub const BEATS_PER_MEASURE: f64 = 4.0;

/// Host playhead snapshot, sampled once per audio block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportInfo {
    /// Position in quarter notes since timeline zero, if the host exposes
    /// one. `None` means "no transport": measure state holds its last value.
    pub beats: Option<f64>,
    pub bpm: f64,
    pub playing: bool,
}

impl Default for TransportInfo {
    fn default() -> Self {
        Self {
            beats: None,
            bpm: 120.0,
            playing: false,
        }
    }
}

/// What changed across one transport update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportDelta {
    /// Playback just stopped; measure indices were reset.
    pub stopped: bool,
    /// The sequence wrapped from its final measure back to measure 0.
    /// Edge-triggered: reported on exactly one update per wrap.
    pub wrapped: bool,
}

/// Derives the current measure from the host playhead, and detects loop
/// wraparound and transport stop.
#[derive(Debug, Default)]
pub struct TransportTracker {
    current_measure: usize,
    previous_measure: Option<usize>,
    was_playing: bool,
    /// Set while the running loop began under a different sequence length;
    /// its wrap must not fire.
    geometry_dirty: bool,
    bpm: f64,
}

impl TransportTracker {
    pub fn new() -> Self {
        Self {
            bpm: 120.0,
            ..Default::default()
        }
    }

    pub fn current_measure(&self) -> usize {
        self.current_measure
    }

    pub fn previous_measure(&self) -> Option<usize> {
        self.previous_measure
    }

    /// Last tempo reported alongside a playhead position.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Forget loop progress so no wrap is detected for a loop begun under
    /// the old sequence length. Wrap detection resumes once the playhead
    /// re-enters measure 0.
    pub fn clear_wrap_memory(&mut self) {
        self.previous_measure = None;
        self.geometry_dirty = true;
    }

    /// Consume one per-block transport snapshot.
    ///
    /// A play→stop edge resets the measure indices. Otherwise, with a
    /// playhead position available, the measure index is floor(beats / 4)
    /// modulo the loop length; a wrap is reported on the update where the
    /// playhead leaves the final measure for measure 0. Without a position
    /// the state holds.
    pub fn update(&mut self, info: &TransportInfo, length: usize) -> TransportDelta {
        let mut delta = TransportDelta::default();

        if self.was_playing && !info.playing {
            self.current_measure = 0;
            self.previous_measure = None;
            self.geometry_dirty = false;
            delta.stopped = true;
        } else if let Some(beats) = info.beats {
            self.bpm = info.bpm;
            let last = length.saturating_sub(1);
            let measures_passed = (beats / BEATS_PER_MEASURE).floor() as i64;
            let new_measure = measures_passed.rem_euclid(length.max(1) as i64) as usize;

            if self.previous_measure.is_some()
                && self.current_measure == last
                && new_measure == 0
                && !self.geometry_dirty
            {
                delta.wrapped = true;
            }
            if new_measure == 0 {
                // A loop is starting under the current length.
                self.geometry_dirty = false;
            }

            self.previous_measure = Some(self.current_measure);
            self.current_measure = new_measure;
        }

        self.was_playing = info.playing;
        delta
    }
}
