//! Frame timing utilities.
//!
//! Brightness samples carry monotonic nanosecond timestamps from the frame
//! source. Stored measurements use frame indices instead, so this module
//! provides:
//! - Conversion between nanoseconds and seconds
//! - A frame timebase anchored at the recording start
//! - A rate controller for throttling slow consumers (progress, UI)

/// Nanoseconds per second.
pub const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Convert a nanosecond value to seconds.
pub fn ns_to_secs(ns: i64) -> f64 {
    ns as f64 / NANOS_PER_SEC
}

/// Maps monotonic timestamps onto frame indices of a recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTimebase {
    /// Timestamp of frame 0 (ns).
    pub start_ns: i64,

    /// Capture frame rate (the real slow-motion rate, not the playback rate).
    pub fps: f64,
}

impl FrameTimebase {
    pub fn new(start_ns: i64, fps: f64) -> Self {
        Self { start_ns, fps }
    }

    /// Frame index containing `timestamp_ns`.
    ///
    /// Frame `n` covers `[timestamp_of(n), timestamp_of(n + 1))`, so the two
    /// conversions invert each other exactly. Timestamps before the start
    /// clamp to frame 0. A non-positive or non-finite fps maps everything to
    /// frame 0.
    pub fn frame_at(&self, timestamp_ns: i64) -> u64 {
        if !self.has_valid_fps() {
            return 0;
        }
        let elapsed_secs = ns_to_secs(timestamp_ns.saturating_sub(self.start_ns));
        let estimate = (elapsed_secs * self.fps).floor();
        if estimate.is_nan() || estimate <= 0.0 {
            return 0;
        }

        // The float estimate can land one frame off either side of a boundary.
        let mut frame = estimate as u64;
        while frame > 0 && self.timestamp_of(frame) > timestamp_ns {
            frame -= 1;
        }
        if frame < u64::MAX && self.timestamp_of(frame + 1) <= timestamp_ns {
            frame += 1;
        }
        frame
    }

    /// First nanosecond at or after the start of `frame`.
    pub fn timestamp_of(&self, frame: u64) -> i64 {
        if !self.has_valid_fps() {
            return self.start_ns;
        }
        let offset = (frame as f64 * NANOS_PER_SEC / self.fps).ceil();
        // float to int casts saturate
        self.start_ns.saturating_add(offset as i64)
    }

    fn has_valid_fps(&self) -> bool {
        self.fps.is_finite() && self.fps > 0.0
    }
}

/// Rate controller for throttled consumers.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }
}
