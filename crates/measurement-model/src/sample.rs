//! Brightness samples and the trace file format.
//!
//! A trace is JSONL: the first line is a `# ` comment carrying a JSON
//! [`TraceHeader`], every following line is one [`BrightnessSample`].
//! Blank lines and further comment lines are ignored on read.

use serde::{Deserialize, Serialize};

/// Monotonic timestamp in nanoseconds, as delivered by the frame source.
pub type TimestampNs = i64;

/// Trace schema version written by this crate.
pub const TRACE_SCHEMA_VERSION: &str = "1.0";

/// Brightness of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrightnessSample {
    /// Frame timestamp (ns).
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    /// Mean luma in `[0.0, 255.0]`.
    #[serde(rename = "b")]
    pub brightness: f64,
}

impl BrightnessSample {
    pub fn new(timestamp_ns: TimestampNs, brightness: f64) -> Self {
        Self {
            timestamp_ns,
            brightness,
        }
    }
}

/// Recording metadata stored at the top of a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Real capture rate of the slow-motion recording.
    pub recording_fps: f64,

    /// Timestamp of the first frame (ns).
    pub recording_start_ns: TimestampNs,

    /// Frame dimensions the samples were taken from, if known.
    #[serde(default)]
    pub frame_width: u32,
    #[serde(default)]
    pub frame_height: u32,

    /// Sampling stride used to reduce each frame.
    #[serde(default = "default_sampling_stride")]
    pub sampling_stride: usize,
}

fn default_sampling_stride() -> usize {
    4
}

impl TraceHeader {
    pub fn new(recording_fps: f64, recording_start_ns: TimestampNs) -> Self {
        Self {
            schema_version: TRACE_SCHEMA_VERSION.to_string(),
            recording_fps,
            recording_start_ns,
            frame_width: 0,
            frame_height: 0,
            sampling_stride: default_sampling_stride(),
        }
    }
}

/// A parsed trace file.
#[derive(Debug, Clone, PartialEq)]
pub struct BrightnessTrace {
    /// Header, when the file carried one.
    pub header: Option<TraceHeader>,

    /// Samples in file order.
    pub samples: Vec<BrightnessSample>,
}

impl BrightnessTrace {
    /// Brightness values in order, dropping timestamps.
    pub fn brightness_values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.brightness).collect()
    }

    /// Whether timestamps strictly increase across the trace.
    pub fn is_monotonic(&self) -> bool {
        self.samples
            .windows(2)
            .all(|pair| pair[1].timestamp_ns > pair[0].timestamp_ns)
    }
}

/// Errors from reading or writing traces.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("Invalid trace header on line {line}: {source}")]
    Header {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Invalid sample on line {line}: {source}")]
    Sample {
        line: usize,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Parse a trace from JSONL content.
pub fn parse_trace(jsonl: &str) -> Result<BrightnessTrace, TraceError> {
    let mut header: Option<TraceHeader> = None;
    let mut samples: Vec<BrightnessSample> = Vec::new();

    for (idx, raw) in jsonl.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim();
            if header.is_none() && samples.is_empty() && comment.starts_with('{') {
                let parsed: TraceHeader = serde_json::from_str(comment).map_err(|source| {
                    TraceError::Header {
                        line: idx + 1,
                        source,
                    }
                })?;
                header = Some(parsed);
            }
            continue;
        }
        let sample: BrightnessSample =
            serde_json::from_str(line).map_err(|source| TraceError::Sample {
                line: idx + 1,
                source,
            })?;
        samples.push(sample);
    }

    Ok(BrightnessTrace { header, samples })
}

/// Serialize a trace to JSONL format.
pub fn serialize_trace(
    header: &TraceHeader,
    samples: &[BrightnessSample],
) -> Result<String, TraceError> {
    let mut output = String::new();
    output.push_str("# ");
    output.push_str(&serde_json::to_string(header)?);
    output.push('\n');
    for sample in samples {
        output.push_str(&serde_json::to_string(sample)?);
        output.push('\n');
    }
    Ok(output)
}
