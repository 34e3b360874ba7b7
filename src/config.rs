//! Layered monitor configuration.
//!
//! Built-in defaults, then an optional TOML file, then environment variables
//! prefixed `ECGWATCH_` with `__` between section and key
//! (`ECGWATCH_WAVEFORM__ENDPOINT=tcp://127.0.0.1:9000`). Command-line flags
//! are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::data::{IntervalMode, BEAT_THRESHOLD, HEART_RATE_HISTORY, MAX_DATA_POINTS};
use crate::render::UPDATE_INTERVAL;
use crate::session::{
    SessionSettings, DEFAULT_CLASSIFICATION_ENDPOINT, DEFAULT_SECONDARY_GRACE,
    DEFAULT_WAVEFORM_ENDPOINT,
};
use crate::source::TransportError;

const ENV_PREFIX: &str = "ECGWATCH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Endpoint(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    pub endpoint: String,
    pub buffer_capacity: usize,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WAVEFORM_ENDPOINT.to_string(),
            buffer_capacity: MAX_DATA_POINTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub endpoint: String,
    /// How long to wait for the analysis system before going live without it.
    #[serde(deserialize_with = "crate::data::duration::deserialize")]
    pub grace: Duration,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CLASSIFICATION_ENDPOINT.to_string(),
            grace: DEFAULT_SECONDARY_GRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    #[serde(deserialize_with = "crate::data::duration::deserialize")]
    pub interval: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            interval: UPDATE_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub threshold: f64,
    pub history: usize,
    pub intervals: IntervalMode,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: BEAT_THRESHOLD,
            history: HEART_RATE_HISTORY,
            intervals: IntervalMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub directory: PathBuf,
    /// Doctor name placed on reports.
    pub doctor: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("reports"),
            doctor: String::new(),
        }
    }
}

/// Complete monitor configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub waveform: WaveformConfig,
    pub classification: ClassificationConfig,
    pub render: RenderConfig,
    pub detector: DetectorConfig,
    pub report: ReportConfig,
}

impl MonitorConfig {
    /// Load defaults, the optional file at `path`, then `ECGWATCH_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: MonitorConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.waveform.buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "waveform.buffer_capacity must be greater than zero".to_string(),
            ));
        }
        if self.detector.history == 0 {
            return Err(ConfigError::Invalid(
                "detector.history must be greater than zero".to_string(),
            ));
        }
        if self.render.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "render.interval must be greater than zero".to_string(),
            ));
        }
        if !self.detector.threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "detector.threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve endpoints and build the session settings.
    pub fn to_settings(&self) -> Result<SessionSettings, ConfigError> {
        Ok(SessionSettings {
            waveform: self.waveform.endpoint.parse()?,
            classification: self.classification.endpoint.parse()?,
            buffer_capacity: self.waveform.buffer_capacity,
            render_interval: self.render.interval,
            threshold: self.detector.threshold,
            history: self.detector.history,
            intervals: self.detector.intervals,
            secondary_grace: self.classification.grace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Endpoint;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecgwatch.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::load_with_prefix(None, "ECGWATCH_TEST_DEFAULTS").unwrap();
        assert_eq!(config, MonitorConfig::default());

        let settings = config.to_settings().unwrap();
        assert_eq!(
            settings.waveform,
            Endpoint::WebSocket("ws://192.168.0.110:81".to_string())
        );
        assert_eq!(settings.render_interval, Duration::from_millis(33));
        assert_eq!(settings.secondary_grace, Duration::from_secs(3));
        assert_eq!(settings.buffer_capacity, 500);
    }

    #[test]
    fn test_file_overrides() {
        let (_dir, path) = write_config(
            r#"
[waveform]
endpoint = "tcp://127.0.0.1:9000"

[classification]
grace = "500ms"

[render]
interval = "20ms"

[detector]
threshold = 0.6
intervals = "midpoint"

[report]
doctor = "Dr. Grey"
"#,
        );

        let config = MonitorConfig::load_with_prefix(Some(&path), "ECGWATCH_TEST_FILE").unwrap();
        assert_eq!(config.waveform.endpoint, "tcp://127.0.0.1:9000");
        assert_eq!(config.waveform.buffer_capacity, 500);
        assert_eq!(config.classification.grace, Duration::from_millis(500));
        assert_eq!(config.render.interval, Duration::from_millis(20));
        assert_eq!(config.detector.threshold, 0.6);
        assert_eq!(config.detector.intervals, IntervalMode::Midpoint);
        assert_eq!(config.report.doctor, "Dr. Grey");
    }

    #[test]
    fn test_environment_overrides_file() {
        let (_dir, path) = write_config("[detector]\nhistory = 3\n");
        std::env::set_var("ECGWATCH_TEST_ENV_DETECTOR__HISTORY", "8");
        std::env::set_var("ECGWATCH_TEST_ENV_WAVEFORM__ENDPOINT", "mem://wave");

        let config = MonitorConfig::load_with_prefix(Some(&path), "ECGWATCH_TEST_ENV").unwrap();
        assert_eq!(config.detector.history, 8);
        assert_eq!(config.waveform.endpoint, "mem://wave");

        std::env::remove_var("ECGWATCH_TEST_ENV_DETECTOR__HISTORY");
        std::env::remove_var("ECGWATCH_TEST_ENV_WAVEFORM__ENDPOINT");
    }

    #[test]
    fn test_validation() {
        let (_dir, path) = write_config("[waveform]\nbuffer_capacity = 0\n");
        assert!(matches!(
            MonitorConfig::load_with_prefix(Some(&path), "ECGWATCH_TEST_INVALID"),
            Err(ConfigError::Invalid(_))
        ));

        let mut config = MonitorConfig::default();
        config.render.interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config = MonitorConfig::default();
        config.detector.threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_duration_rejected() {
        let (_dir, path) = write_config("[render]\ninterval = \"soon\"\n");
        assert!(matches!(
            MonitorConfig::load_with_prefix(Some(&path), "ECGWATCH_TEST_DURATION"),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_unknown_scheme_in_settings() {
        let mut config = MonitorConfig::default();
        config.classification.endpoint = "http://localhost:8765".to_string();
        assert!(matches!(
            config.to_settings(),
            Err(ConfigError::Endpoint(TransportError::UnsupportedScheme(_)))
        ));
    }
}
