use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PEAK_COUNT: usize = 2000;
pub const DEFAULT_CELL_WIDTH: f32 = 40.0;
pub const DEFAULT_CELL_HEIGHT: f32 = 60.0;
pub const DEFAULT_TRACK_HEIGHT: f32 = 60.0;
pub const DEFAULT_ZOOM_MAX: f32 = 16.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderBackend {
    #[default]
    Gstreamer,
    Ffmpeg,
}

/// Adaptive ruler spacing. Durations above `long_threshold` use
/// `long_interval`, above `medium_threshold` use `medium_interval`, anything
/// shorter uses `short_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulerConfig {
    pub medium_threshold: f64,
    pub long_threshold: f64,
    pub short_interval: f64,
    pub medium_interval: f64,
    pub long_interval: f64,
}

impl Default for RulerConfig {
    fn default() -> Self {
        Self {
            medium_threshold: 60.0,
            long_threshold: 180.0,
            short_interval: 5.0,
            medium_interval: 10.0,
            long_interval: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub peak_count: usize,
    pub cell_width: f32,
    pub cell_height: f32,
    pub amplitude_scale: f32,
    pub track_height: f32,
    pub zoom_max: f32,
    pub ruler: RulerConfig,
    pub decoder_backend: DecoderBackend,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            peak_count: DEFAULT_PEAK_COUNT,
            cell_width: DEFAULT_CELL_WIDTH,
            cell_height: DEFAULT_CELL_HEIGHT,
            amplitude_scale: 1.0,
            track_height: DEFAULT_TRACK_HEIGHT,
            zoom_max: DEFAULT_ZOOM_MAX,
            ruler: RulerConfig::default(),
            decoder_backend: DecoderBackend::default(),
        }
    }
}

impl TimelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peak_count == 0 {
            return Err(ConfigError::Invalid("peak_count must be at least 1".into()));
        }
        if !(self.cell_width > 0.0) || !(self.cell_height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cell size must be positive, got {}x{}",
                self.cell_width, self.cell_height
            )));
        }
        if !(self.track_height > 0.0) {
            return Err(ConfigError::Invalid("track_height must be positive".into()));
        }
        if !(self.amplitude_scale >= 0.0) {
            return Err(ConfigError::Invalid("amplitude_scale must not be negative".into()));
        }
        if !(self.zoom_max >= 1.0) {
            return Err(ConfigError::Invalid("zoom_max must be at least 1".into()));
        }
        let r = &self.ruler;
        if !(r.medium_threshold < r.long_threshold) {
            return Err(ConfigError::Invalid(
                "ruler.medium_threshold must be below ruler.long_threshold".into(),
            ));
        }
        if !(r.short_interval > 0.0 && r.medium_interval > 0.0 && r.long_interval > 0.0) {
            return Err(ConfigError::Invalid("ruler intervals must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = TimelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.peak_count, 2000);
        assert_eq!((config.cell_width, config.cell_height), (40.0, 60.0));
        assert_eq!(config.ruler.medium_threshold, 60.0);
        assert_eq!(config.ruler.long_threshold, 180.0);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"peak_count": 500, "decoder_backend": "ffmpeg"}}"#).unwrap();
        let config = TimelineConfig::load(file.path()).unwrap();
        assert_eq!(config.peak_count, 500);
        assert_eq!(config.decoder_backend, DecoderBackend::Ffmpeg);
        assert_eq!(config.cell_width, DEFAULT_CELL_WIDTH);
    }

    #[test]
    fn rejects_zero_peaks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"peak_count": 0}}"#).unwrap();
        assert!(matches!(
            TimelineConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_inverted_ruler_thresholds() {
        let mut config = TimelineConfig::default();
        config.ruler.medium_threshold = 200.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = TimelineConfig::load(Path::new("/nonexistent/narrate.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
