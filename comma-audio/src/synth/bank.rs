//! WAV sample banks: preset loading and lookup.
//!
//! A bank is either a single `.wav` file (one preset) or a directory whose
//! `.wav` files are the presets, ordered by file name. Loading is
//! all-or-nothing: any unreadable file fails the whole bank.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Root key assumed when a file stem carries no `-NN` suffix: middle C.
pub const DEFAULT_ROOT_KEY: u8 = 60;

/// One playable sample: mono frames plus the key it was recorded at.
/// Frames are shared so sounding voices keep their audio alive across a
/// bank unload.
#[derive(Debug, Clone)]
pub struct SamplePreset {
    name: String,
    root_key: u8,
    sample_rate: u32,
    frames: Arc<Vec<f32>>,
}

impl SamplePreset {
    /// Build a preset directly from frames, bypassing file loading — the
    /// in-memory path for hosts that ship their own audio data.
    pub fn from_frames(name: &str, root_key: u8, sample_rate: u32, frames: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            root_key,
            sample_rate,
            frames: Arc::new(frames),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIDI note the sample sounds at when played back unshifted.
    pub fn root_key(&self) -> u8 {
        self.root_key
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> &[f32] {
        &self.frames
    }
}

/// A loaded set of presets with a current selection.
#[derive(Debug)]
pub struct SampleBank {
    name: String,
    path: PathBuf,
    presets: Vec<SamplePreset>,
    current: usize,
}

impl SampleBank {
    /// Load a bank from a `.wav` file or a directory of them.
    pub fn load(path: &Path) -> Result<Self, String> {
        let mut presets = Vec::new();

        if path.is_dir() {
            let entries =
                fs::read_dir(path).map_err(|e| format!("cannot read bank dir {:?}: {}", path, e))?;
            let mut files: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| {
                    p.extension()
                        .map(|ext| ext.eq_ignore_ascii_case("wav"))
                        .unwrap_or(false)
                })
                .collect();
            files.sort();
            if files.is_empty() {
                return Err(format!("no .wav files in {:?}", path));
            }
            for file in &files {
                presets.push(load_preset(file)?);
            }
        } else {
            presets.push(load_preset(path)?);
        }

        let name = path
            .file_stem()
            .or_else(|| path.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or("bank")
            .to_string();

        Ok(Self {
            name,
            path: path.to_path_buf(),
            presets,
            current: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    pub fn preset_name(&self, index: usize) -> Option<&str> {
        self.presets.get(index).map(|p| p.name())
    }

    /// Select a preset; out-of-range indices keep the current selection.
    pub fn select_preset(&mut self, index: usize) -> bool {
        if index < self.presets.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    pub fn current_preset(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &SamplePreset {
        &self.presets[self.current]
    }
}

fn load_preset(path: &Path) -> Result<SamplePreset, String> {
    let reader =
        hound::WavReader::open(path).map_err(|e| format!("cannot open {:?}: {}", path, e))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| format!("cannot decode {:?}: {}", path, e))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(|e| format!("cannot decode {:?}: {}", path, e))?
        }
    };

    let frames = downmix(&samples, channels);
    if frames.is_empty() {
        return Err(format!("{:?} contains no audio", path));
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("preset");
    let (name, root_key) = split_root_key(stem);

    Ok(SamplePreset {
        name,
        root_key,
        sample_rate: spec.sample_rate,
        frames: Arc::new(frames),
    })
}

fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Split a trailing `-NN` root-key suffix off a file stem, e.g.
/// "epiano-48" → ("epiano", 48). Without a valid suffix the whole stem is
/// the name and the root key defaults to middle C.
fn split_root_key(stem: &str) -> (String, u8) {
    if let Some((base, suffix)) = stem.rsplit_once('-') {
        if let Ok(note) = suffix.parse::<u8>() {
            if note <= 127 && !base.is_empty() {
                return (base.to_string(), note);
            }
        }
    }
    (stem.to_string(), DEFAULT_ROOT_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, frames: &[f32], channels: u16, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &frame in frames {
            writer.write_sample(frame).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_single_file_bank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pluck.wav");
        write_wav(&path, &[0.0, 0.5, -0.5, 0.25], 1, 44100);

        let bank = SampleBank::load(&path).unwrap();
        assert_eq!(bank.preset_count(), 1);
        assert_eq!(bank.preset_name(0), Some("pluck"));
        assert_eq!(bank.current().root_key(), DEFAULT_ROOT_KEY);
        assert_eq!(bank.current().frames().len(), 4);
    }

    #[test]
    fn loads_directory_bank_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("b_strings.wav"), &[0.1; 8], 1, 44100);
        write_wav(&dir.path().join("a_piano.wav"), &[0.2; 8], 1, 44100);
        std::fs::write(dir.path().join("notes.txt"), "not audio").unwrap();

        let bank = SampleBank::load(dir.path()).unwrap();
        assert_eq!(bank.preset_count(), 2);
        assert_eq!(bank.preset_name(0), Some("a_piano"));
        assert_eq!(bank.preset_name(1), Some("b_strings"));
    }

    #[test]
    fn root_key_parsed_from_stem_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epiano-48.wav");
        write_wav(&path, &[0.1; 8], 1, 44100);

        let bank = SampleBank::load(&path).unwrap();
        assert_eq!(bank.current().name(), "epiano");
        assert_eq!(bank.current().root_key(), 48);
    }

    #[test]
    fn bad_root_key_suffix_is_part_of_the_name() {
        assert_eq!(split_root_key("epiano-200"), ("epiano-200".into(), 60));
        assert_eq!(split_root_key("-48"), ("-48".into(), 60));
        assert_eq!(split_root_key("plain"), ("plain".into(), 60));
    }

    #[test]
    fn stereo_is_downmixed_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.wav");
        // Two stereo frames: (1.0, 0.0) and (0.5, 0.5).
        write_wav(&path, &[1.0, 0.0, 0.5, 0.5], 2, 48000);

        let bank = SampleBank::load(&path).unwrap();
        let frames = bank.current().frames();
        assert_eq!(frames.len(), 2);
        assert!((frames[0] - 0.5).abs() < 1e-6);
        assert!((frames[1] - 0.5).abs() < 1e-6);
        assert_eq!(bank.current().sample_rate(), 48000);
    }

    #[test]
    fn missing_path_fails() {
        assert!(SampleBank::load(Path::new("/nonexistent/bank.wav")).is_err());
    }

    #[test]
    fn directory_without_wavs_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), "not audio").unwrap();
        assert!(SampleBank::load(dir.path()).is_err());
    }

    #[test]
    fn select_preset_ignores_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("one.wav"), &[0.1; 4], 1, 44100);
        write_wav(&dir.path().join("two.wav"), &[0.1; 4], 1, 44100);

        let mut bank = SampleBank::load(dir.path()).unwrap();
        assert!(bank.select_preset(1));
        assert_eq!(bank.current_preset(), 1);
        assert!(!bank.select_preset(2));
        assert_eq!(bank.current_preset(), 1, "out-of-range keeps selection");
    }
}
