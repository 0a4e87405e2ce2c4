//! Shutter speed calculation and comparison against dial settings.
//!
//! Speeds are handled in two notations: exposure time in seconds (what a
//! user types, `1/500`) and the `1/x` denominator stored on events.

use shutterscope_common::{ShutterscopeError, ShutterscopeResult};
use shutterscope_measurement_model::ShutterEvent;

pub use shutterscope_measurement_model::deviation_percent;

/// Exposure time of `frames` frames in a recording captured at `recording_fps`.
pub fn duration_seconds(frames: f64, recording_fps: f64) -> f64 {
    if !(recording_fps.is_finite() && recording_fps > 0.0) {
        return 0.0;
    }
    frames / recording_fps
}

/// Measured speed of `event` as a `1/x` denominator.
///
/// With `use_weighted` the fractional frame count is used, which only
/// differs from the plain count when the event carries a baseline.
pub fn measured_speed(event: &ShutterEvent, recording_fps: f64, use_weighted: bool) -> f64 {
    let frames = if use_weighted {
        event.weighted_duration_frames()
    } else {
        event.duration_frames() as f64
    };
    let secs = duration_seconds(frames, recording_fps);
    if secs <= 0.0 {
        0.0
    } else {
        1.0 / secs
    }
}

/// Parse a comma-separated list like `"1/500, 1/250, 1, 2"` into seconds.
pub fn parse_speed_list(input: &str) -> ShutterscopeResult<Vec<f64>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(parse_speed)
        .collect()
}

fn parse_speed(token: &str) -> ShutterscopeResult<f64> {
    let invalid = || ShutterscopeError::invalid_argument(format!("invalid shutter speed '{token}'"));
    let number = |s: &str| s.trim().parse::<f64>().map_err(|_| invalid());

    let secs = match token.split_once('/') {
        Some((num, denom)) => {
            let denom = number(denom)?;
            if denom == 0.0 {
                return Err(ShutterscopeError::invalid_argument(format!(
                    "zero denominator in shutter speed '{token}'"
                )));
            }
            number(num)? / denom
        }
        None => number(token)?,
    };

    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err(invalid())
    }
}

/// Human-readable speed: `"1/500"` below one second, `"2.0s"` otherwise.
pub fn format_speed(seconds: f64) -> String {
    if !(seconds.is_finite() && seconds > 0.0) {
        return "n/a".to_string();
    }
    if seconds >= 1.0 {
        format!("{seconds:.1}s")
    } else {
        format!("1/{}", (1.0 / seconds).round() as u64)
    }
}

/// Pair events with the speeds they were shot at.
///
/// The shortest event is paired with the fastest speed, and so on. Extra
/// events or speeds on either side are dropped. Returned events carry
/// both the expected and the measured speed.
pub fn match_expected(
    events: &[ShutterEvent],
    expected_secs: &[f64],
    recording_fps: f64,
) -> Vec<ShutterEvent> {
    let mut by_duration: Vec<&ShutterEvent> = events.iter().collect();
    by_duration.sort_by_key(|e| e.duration_frames());

    let mut speeds = expected_secs.to_vec();
    speeds.sort_by(f64::total_cmp);

    by_duration
        .into_iter()
        .zip(speeds)
        .map(|(event, secs)| {
            let measured = measured_speed(event, recording_fps, true);
            event
                .clone()
                .with_speeds(Some(1.0 / secs), Some(measured))
        })
        .collect()
}
