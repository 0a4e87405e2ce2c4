//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ShutterscopeError, ShutterscopeResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where measurement sessions are stored.
    pub sessions_dir: PathBuf,

    /// Default live detector parameters.
    #[serde(default)]
    pub detector: DetectorDefaults,

    /// Default brightness sampling parameters.
    #[serde(default)]
    pub sampler: SamplerDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default calibration parameters for the live detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorDefaults {
    /// Number of closed-shutter frames used to learn the baseline.
    pub calibration_frame_count: usize,

    /// Fraction of the baseline→peak span where the threshold sits.
    pub threshold_factor: f64,

    /// Brightness margin above baseline that counts as the calibration actuation.
    pub bootstrap_margin: f64,

    /// Smallest allowed gap between threshold and baseline.
    pub min_threshold_margin: f64,
}

/// Default parameters for reducing a luma plane to one brightness value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerDefaults {
    /// Visit every Nth pixel on every Nth row.
    pub stride: usize,

    /// Centered fraction of the frame to sample, in `(0.0, 1.0]`.
    pub central_fraction: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "shutterscope=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sessions_dir: dirs_default_sessions(),
            detector: DetectorDefaults::default(),
            sampler: SamplerDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DetectorDefaults {
    fn default() -> Self {
        Self {
            calibration_frame_count: 30,
            threshold_factor: 0.8,
            bootstrap_margin: 10.0,
            min_threshold_margin: 1.0,
        }
    }
}

impl Default for SamplerDefaults {
    fn default() -> Self {
        Self {
            stride: 4,
            central_fraction: 1.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location.
    ///
    /// A missing file yields the defaults. An unreadable or malformed file
    /// is an error, left to the caller to report once logging is set up.
    pub fn load() -> ShutterscopeResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path.
    pub fn load_from(config_path: &Path) -> ShutterscopeResult<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            ShutterscopeError::config(format!("failed to read {}: {e}", config_path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ShutterscopeError::config(format!("failed to parse {}: {e}", config_path.display()))
        })
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("shutterscope").join("config.json")
}

/// Default sessions directory.
fn dirs_default_sessions() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("shutterscope").join("sessions")
}
