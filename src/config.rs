// Session configuration - Run parameters and engine constants
//
// Out-of-range run parameters are replaced by defaults, never rejected. Only
// reading or parsing a config file can fail.

use crate::scheduling::load::LoadProfile;
use crate::scheduling::sampler::DEFAULT_SCHEDULE_THRESHOLD;
use crate::sequencer::timeline::{MusicalGrid, Tempo, TimeSignature};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_VOICE_COUNT: i64 = 4;
pub const DEFAULT_DURATION_SECONDS: i64 = 60;
pub const DEFAULT_PHASE_COUNT: i64 = 3;

/// Config file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Constants of the musical grid and of the voice loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub tempo_bpm: f64,
    pub ticks_per_quarter: u32,
    pub beats_per_bar: u8,
    /// CPU/wall ratio above which a voice counts as scheduled
    pub schedule_threshold: f64,
    pub sleep_ms: u64,
    pub busy_work_min: u32,
    pub busy_work_max: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tempo_bpm: 200.0,
            ticks_per_quarter: MusicalGrid::DEFAULT_TICKS_PER_QUARTER,
            beats_per_bar: 4,
            schedule_threshold: DEFAULT_SCHEDULE_THRESHOLD,
            sleep_ms: LoadProfile::DEFAULT_SLEEP_MS,
            busy_work_min: LoadProfile::DEFAULT_BUSY_WORK_MIN,
            busy_work_max: LoadProfile::DEFAULT_BUSY_WORK_MAX,
        }
    }
}

impl EngineSettings {
    /// Highest resolution a MIDI file header can carry
    const MAX_TICKS_PER_QUARTER: u32 = 0x7FFF;

    /// Tick grid built from these settings, out-of-range values replaced by
    /// their defaults
    pub fn grid(&self) -> MusicalGrid {
        let defaults = Self::default();

        let bpm = if (Tempo::MIN_BPM..=Tempo::MAX_BPM).contains(&self.tempo_bpm) {
            self.tempo_bpm
        } else {
            defaults.tempo_bpm
        };
        let tpq_range = 4..=Self::MAX_TICKS_PER_QUARTER;
        let ticks_per_quarter = if tpq_range.contains(&self.ticks_per_quarter) {
            self.ticks_per_quarter
        } else {
            defaults.ticks_per_quarter
        };
        let beats_per_bar = if self.beats_per_bar > 0 {
            self.beats_per_bar
        } else {
            defaults.beats_per_bar
        };

        MusicalGrid::new(
            Tempo::new(bpm),
            TimeSignature::new(beats_per_bar, 4),
            ticks_per_quarter,
        )
    }

    pub fn load_profile(&self) -> LoadProfile {
        LoadProfile::new(
            self.busy_work_min,
            self.busy_work_max,
            Duration::from_millis(self.sleep_ms),
        )
    }

    /// Negative or NaN thresholds fall back to the default
    pub fn threshold(&self) -> f64 {
        if self.schedule_threshold >= 0.0 {
            self.schedule_threshold
        } else {
            DEFAULT_SCHEDULE_THRESHOLD
        }
    }
}

/// Parameters of one generation run
///
/// Counts are signed so that whatever the user typed can be read and then
/// clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub voice_count: i64,
    pub duration_seconds: i64,
    pub phase_count: i64,
    /// Seed for pattern generation and busy work; random when absent
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
    pub engine: EngineSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            voice_count: DEFAULT_VOICE_COUNT,
            duration_seconds: DEFAULT_DURATION_SECONDS,
            phase_count: DEFAULT_PHASE_COUNT,
            seed: None,
            output_dir: PathBuf::from("."),
            engine: EngineSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Read a RON config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Copy with every count <= 0 replaced by its default
    pub fn sanitized(&self) -> Self {
        Self {
            voice_count: positive_or(self.voice_count, DEFAULT_VOICE_COUNT),
            duration_seconds: positive_or(self.duration_seconds, DEFAULT_DURATION_SECONDS),
            phase_count: positive_or(self.phase_count, DEFAULT_PHASE_COUNT),
            ..self.clone()
        }
    }

    /// Number of voice threads, the drum voice included
    pub fn voices(&self) -> usize {
        positive_or(self.voice_count, DEFAULT_VOICE_COUNT) as usize
    }

    pub fn duration(&self) -> u32 {
        positive_or(self.duration_seconds, DEFAULT_DURATION_SECONDS).min(u32::MAX as i64) as u32
    }

    pub fn phases(&self) -> usize {
        positive_or(self.phase_count, DEFAULT_PHASE_COUNT) as usize
    }
}

fn positive_or(value: i64, default: i64) -> i64 {
    if value > 0 { value } else { default }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.voices(), 4);
        assert_eq!(config.duration(), 60);
        assert_eq!(config.phases(), 3);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_invalid_counts_take_defaults() {
        let config = SessionConfig {
            voice_count: 0,
            duration_seconds: -5,
            phase_count: -1,
            ..SessionConfig::default()
        };

        let sanitized = config.sanitized();
        assert_eq!(sanitized.voice_count, 4);
        assert_eq!(sanitized.duration_seconds, 60);
        assert_eq!(sanitized.phase_count, 3);
        assert_eq!(config.voices(), 4);
    }

    #[test]
    fn test_valid_counts_are_kept() {
        let config = SessionConfig {
            voice_count: 1,
            duration_seconds: 4,
            phase_count: 1,
            ..SessionConfig::default()
        };
        assert_eq!(config.sanitized(), config);
        assert_eq!(config.voices(), 1);
        assert_eq!(config.duration(), 4);
        assert_eq!(config.phases(), 1);
    }

    #[test]
    fn test_partial_ron() {
        let config = SessionConfig::from_ron("(voice_count: 8, seed: Some(7))").unwrap();
        assert_eq!(config.voices(), 8);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.duration(), 60);
        assert_eq!(config.engine, EngineSettings::default());
    }

    #[test]
    fn test_nested_engine_settings() {
        let config =
            SessionConfig::from_ron("(engine: (tempo_bpm: 120.0, sleep_ms: 2))").unwrap();
        assert_eq!(config.engine.tempo_bpm, 120.0);
        assert_eq!(config.engine.ticks_per_quarter, 480);
        assert_eq!(config.engine.load_profile().sleep, Duration::from_millis(2));
    }

    #[test]
    fn test_malformed_ron_is_an_error() {
        let result = SessionConfig::from_ron("(voice_count: \"many\")");
        assert!(matches!(result, Err(ConfigError::Ron(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = SessionConfig::load(Path::new("/nonexistent/thread_music.ron"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.ron");
        std::fs::write(&path, "(phase_count: 5, output_dir: \"out\")").unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.phases(), 5);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_grid_from_settings() {
        let grid = EngineSettings::default().grid();
        assert_eq!(grid.ticks_per_second(), 1600.0);
        assert_eq!(grid.ticks_per_bar(), 1920);
        assert_eq!(grid.ticks_per_step(), 120);
    }

    #[test]
    fn test_grid_rejects_out_of_range_settings() {
        let settings = EngineSettings {
            tempo_bpm: 5000.0,
            ticks_per_quarter: 0,
            beats_per_bar: 0,
            ..EngineSettings::default()
        };
        assert_eq!(settings.grid(), MusicalGrid::default());
    }

    #[test]
    fn test_negative_threshold_falls_back() {
        let settings = EngineSettings {
            schedule_threshold: -1.0,
            ..EngineSettings::default()
        };
        assert_eq!(settings.threshold(), DEFAULT_SCHEDULE_THRESHOLD);
    }
}
