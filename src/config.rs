//! Engine configuration, read from and written to [ron] files.
//!
//! Every field has a default, so a file only needs to name what it changes:
//!
//! ```text
//! (
//!     refresh: (trigger: Time, time_threshold: 5.0),
//!     spotlight: (angle_degrees: 20.0),
//! )
//! ```

use crate::announcer::SpeechConfig;
use crate::capture::DEFAULT_CAPTURE_TIMEOUT;
use crate::cone_sampler::SamplerConfig;
use crate::dedup::{DEFAULT_PROXIMITY_RADIUS, DEFAULT_TOLERANCE};
use crate::geometry::{Meters, Seconds};
use crate::proximity_audio::AudioConfig;
use crate::region_merger::COMBINE_THRESHOLD;
use crate::scheduler::RefreshConfig;
use crate::spotlight::SpotlightConfig;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, fs, path::Path};

/// Dedup index tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Bucket divisor and maximum edit distance, one value
    pub tolerance: usize,
    #[allow(missing_docs)]
    pub proximity_radius: Meters,
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            tolerance: DEFAULT_TOLERANCE,
            proximity_radius: DEFAULT_PROXIMITY_RADIUS,
        }
    }
}

/// Everything the engine can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[allow(missing_docs)]
    pub sampler: SamplerConfig,
    #[allow(missing_docs)]
    pub refresh: RefreshConfig,
    #[allow(missing_docs)]
    pub spotlight: SpotlightConfig,
    #[allow(missing_docs)]
    pub dedup: DedupConfig,
    #[allow(missing_docs)]
    pub audio: AudioConfig,
    #[allow(missing_docs)]
    pub speech: SpeechConfig,
    /// Pixel gap below which OCR boxes merge
    pub combine_threshold: f64,
    /// Live annotation count above which the user is warned
    pub max_annotations: usize,
    /// How long a capture may stay in flight
    pub capture_timeout: Seconds,
    /// Half-angle of the "in view" cone used when reading text, in degrees
    pub read_angle_degrees: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sampler: SamplerConfig::default(),
            refresh: RefreshConfig::default(),
            spotlight: SpotlightConfig::default(),
            dedup: DedupConfig::default(),
            audio: AudioConfig::default(),
            speech: SpeechConfig::default(),
            combine_threshold: COMBINE_THRESHOLD,
            max_annotations: 30,
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
            read_angle_degrees: 60.0,
        }
    }
}

/// What can go wrong loading or saving an [`EngineConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// Returned when io fails when reading or writing files.
    IoError(std::io::Error),

    /// Returned when serialization fails.
    RonError(ron::Error),

    /// Returned when deserialization fails.
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConfigError as CE;
        let msg = match self {
            CE::IoError(error) => Cow::from(format!("io error: {}", error)),
            CE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            CE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(value: ron::Error) -> Self {
        Self::RonError(value)
    }
}

impl From<ron::de::SpannedError> for ConfigError {
    fn from(value: ron::de::SpannedError) -> Self {
        Self::RonSpannedError(value)
    }
}

impl EngineConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    /// Renders the configuration as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Reads a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Writes the configuration to a file, replacing it.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proximity_audio::Falloff;
    use crate::scheduler::RefreshTrigger;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_files_fill_in_defaults() {
        let cfg = EngineConfig::from_ron_str(
            "(refresh: (trigger: Time, time_threshold: 5.0), max_annotations: 12)",
        )
        .unwrap();
        assert_eq!(cfg.refresh.trigger, RefreshTrigger::Time);
        assert_eq!(cfg.refresh.time_threshold, 5.0);
        assert_eq!(cfg.refresh.distance_threshold, 2.0);
        assert_eq!(cfg.max_annotations, 12);
        assert_eq!(cfg.sampler, SamplerConfig::default());
        assert_eq!(cfg.dedup.tolerance, 7);
    }

    #[test]
    fn file_round_trip() {
        let mut cfg = EngineConfig::default();
        cfg.audio.falloff = Falloff::Linear;
        cfg.spotlight.angle_degrees = 20.0;

        let file = NamedTempFile::new().unwrap();
        cfg.to_path(file.path()).unwrap();
        assert_eq!(EngineConfig::from_path(file.path()).unwrap(), cfg);
    }

    #[test]
    fn bad_files_are_reported() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(sampler: (max_samples: \"lots\"))").unwrap();
        match EngineConfig::from_path(file.path()) {
            Err(ConfigError::RonSpannedError(_)) => {}
            other => panic!("expected a ron error, got {:?}", other),
        }

        match EngineConfig::from_path("/definitely/not/here.ron") {
            Err(ConfigError::IoError(_)) => {}
            other => panic!("expected an io error, got {:?}", other),
        }
    }
}
