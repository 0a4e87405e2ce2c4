//! Shutter event types.
//!
//! A [`DetectedEvent`] is what the live detector reports: a timestamp-bounded
//! span during which brightness stayed above threshold. A [`ShutterEvent`]
//! is the same span on the recording's frame grid, with the brightness
//! context needed to turn it into a speed measurement.
//!
//! Shutter speeds are stored as the denominator `x` of `1/x` seconds, the
//! way they are printed on a shutter dial (`500.0` means 1/500 s).

use serde::{Deserialize, Serialize};

use crate::sample::TimestampNs;
use crate::stats;

/// A completed above-threshold span reported by the live detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedEvent {
    /// Timestamp of the first above-threshold frame.
    pub start_timestamp_ns: TimestampNs,

    /// Timestamp of the last above-threshold frame.
    pub end_timestamp_ns: TimestampNs,

    /// Brightness of every above-threshold frame, in order.
    pub brightness_values: Vec<f64>,
}

/// One shutter actuation measured on the frame grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutterEvent {
    /// First open frame (inclusive).
    pub start_frame: u64,

    /// Last open frame (inclusive).
    pub end_frame: u64,

    /// Brightness of each open frame.
    pub brightness_values: Vec<f64>,

    /// Closed-shutter brightness learned during calibration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_brightness: Option<f64>,

    /// Fully-open brightness learned during calibration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_brightness: Option<f64>,

    /// Speed set on the camera, as `1/x` denominator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_speed: Option<f64>,

    /// Speed measured from this event, as `1/x` denominator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_speed: Option<f64>,
}

impl ShutterEvent {
    /// Create an event without brightness context. `end_frame` is raised to
    /// `start_frame` if it would precede it.
    pub fn new(start_frame: u64, end_frame: u64, brightness_values: Vec<f64>) -> Self {
        Self {
            start_frame,
            end_frame: end_frame.max(start_frame),
            brightness_values,
            baseline_brightness: None,
            peak_brightness: None,
            expected_speed: None,
            measured_speed: None,
        }
    }

    /// Attach calibration context.
    pub fn with_calibration(mut self, baseline: Option<f64>, peak: Option<f64>) -> Self {
        self.baseline_brightness = baseline;
        self.peak_brightness = peak;
        self
    }

    /// Attach the expected and measured speeds.
    pub fn with_speeds(mut self, expected: Option<f64>, measured: Option<f64>) -> Self {
        self.expected_speed = expected;
        self.measured_speed = measured;
        self
    }

    /// Number of frames from start to end, inclusive.
    pub fn duration_frames(&self) -> u64 {
        self.end_frame.saturating_sub(self.start_frame) + 1
    }

    /// Frame count where partially open transition frames count fractionally.
    ///
    /// The event's own median brightness is taken as its plateau, so frames
    /// at or above the median weigh 1.0 and frames between baseline and the
    /// plateau ramp linearly from 0.0. Falls back to [`duration_frames`]
    /// without brightness values, without a baseline, or when the plateau
    /// does not clear the baseline.
    ///
    /// [`duration_frames`]: Self::duration_frames
    pub fn weighted_duration_frames(&self) -> f64 {
        let unweighted = self.duration_frames() as f64;
        if self.brightness_values.is_empty() {
            return unweighted;
        }
        let Some(baseline) = self.baseline_brightness else {
            return unweighted;
        };

        let event_peak = stats::median(&self.brightness_values);
        if event_peak <= baseline {
            return unweighted;
        }

        let range = event_peak - baseline;
        self.brightness_values
            .iter()
            .map(|b| ((b - baseline) / range).clamp(0.0, 1.0))
            .sum()
    }

    pub fn max_brightness(&self) -> f64 {
        stats::max(&self.brightness_values)
    }

    pub fn avg_brightness(&self) -> f64 {
        stats::mean(&self.brightness_values)
    }

    /// Percentage by which the measured exposure is longer (positive) or
    /// shorter (negative) than expected. `None` unless both speeds are set.
    pub fn deviation_percent(&self) -> Option<f64> {
        let expected = self.expected_speed.filter(|s| *s > 0.0)?;
        let measured = self.measured_speed.filter(|s| *s > 0.0)?;
        Some(deviation_percent(measured, expected))
    }
}

/// Percentage by which the measured exposure exceeds the expected one.
/// Both arguments are `1/x` denominators.
pub fn deviation_percent(measured: f64, expected: f64) -> f64 {
    let measured_secs = 1.0 / measured;
    let expected_secs = 1.0 / expected;
    (measured_secs - expected_secs) / expected_secs * 100.0
}
