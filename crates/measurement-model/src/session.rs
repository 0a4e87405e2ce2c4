//! Measurement session files.
//!
//! A session is the persisted outcome of one run over a recording: which
//! recording it was, what calibration was learned, and every shutter event
//! with its derived measurements.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::event::ShutterEvent;
use crate::sample::TimestampNs;

/// Session schema version written by this crate.
pub const SESSION_SCHEMA_VERSION: &str = "1.0";

/// Top-level session file (`<id>.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementSession {
    /// Schema version.
    pub version: String,

    /// Unique session identifier (UUID).
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Recording the events were measured on.
    pub recording: RecordingInfo,

    /// Calibration in effect while events were detected.
    pub calibration: CalibrationRecord,

    /// Measured events in detection order.
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

/// Recording metadata needed to interpret frame indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingInfo {
    /// Real capture rate of the slow-motion recording.
    pub fps: f64,

    /// Timestamp of frame 0 (ns).
    pub start_ns: TimestampNs,

    /// Trace or video the measurement came from.
    #[serde(default)]
    pub source: Option<String>,
}

/// Learned brightness levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Closed-shutter brightness.
    pub baseline: f64,

    /// Open/closed decision level.
    pub threshold: f64,

    /// Fully-open brightness, when a calibration actuation was captured.
    #[serde(default)]
    pub peak: Option<f64>,
}

/// A shutter event together with its derived values, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(flatten)]
    pub event: ShutterEvent,

    pub duration_frames: u64,

    pub weighted_duration_frames: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviation_percent: Option<f64>,
}

impl From<ShutterEvent> for EventRecord {
    fn from(event: ShutterEvent) -> Self {
        Self {
            duration_frames: event.duration_frames(),
            weighted_duration_frames: event.weighted_duration_frames(),
            deviation_percent: event.deviation_percent(),
            event,
        }
    }
}

impl MeasurementSession {
    /// Create a new session with a fresh id and no events.
    pub fn new(
        name: impl Into<String>,
        recording: RecordingInfo,
        calibration: CalibrationRecord,
    ) -> Self {
        Self {
            version: SESSION_SCHEMA_VERSION.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            recording,
            calibration,
            events: vec![],
        }
    }

    /// Append events, deriving their stored values.
    pub fn extend_events(&mut self, events: impl IntoIterator<Item = ShutterEvent>) {
        self.events.extend(events.into_iter().map(EventRecord::from));
    }

    /// Events without their derived values.
    pub fn shutter_events(&self) -> Vec<ShutterEvent> {
        self.events.iter().map(|r| r.event.clone()).collect()
    }

    /// Mean absolute deviation over events that have an expected speed.
    pub fn mean_abs_deviation(&self) -> Option<f64> {
        let deviations: Vec<f64> = self
            .events
            .iter()
            .filter_map(|r| r.deviation_percent)
            .map(f64::abs)
            .collect();
        if deviations.is_empty() {
            None
        } else {
            Some(deviations.iter().sum::<f64>() / deviations.len() as f64)
        }
    }

    /// Default file name inside a sessions directory.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.id)
    }

    /// Load a session from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path).map_err(|e| SessionError::IoError {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SessionError::ParseError { path, source: e })
    }

    /// Save the session as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| SessionError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, json).map_err(|e| SessionError::IoError { path, source: e })
    }

    /// Save into `dir` under [`file_name`](Self::file_name), returning the path.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        let path = dir.as_ref().join(self.file_name());
        self.save(&path)?;
        Ok(path)
    }
}

/// Errors that can occur when working with session files.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}
