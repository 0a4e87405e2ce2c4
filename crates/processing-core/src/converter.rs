//! Detector output → frame-indexed shutter events.

use shutterscope_common::FrameTimebase;
use shutterscope_measurement_model::{DetectedEvent, ShutterEvent, TimestampNs};

/// Frame index containing `timestamp_ns` in a recording that began at
/// `recording_start_ns` and was captured at `fps`.
pub fn timestamp_to_frame(
    timestamp_ns: TimestampNs,
    recording_start_ns: TimestampNs,
    fps: f64,
) -> u64 {
    FrameTimebase::new(recording_start_ns, fps).frame_at(timestamp_ns)
}

/// Converts timestamp-bounded detector events into [`ShutterEvent`]s on
/// the recording's frame grid, attaching the learned calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventConverter {
    timebase: FrameTimebase,
    baseline: Option<f64>,
    peak: Option<f64>,
}

impl EventConverter {
    pub fn new(recording_start_ns: TimestampNs, recording_fps: f64) -> Self {
        Self {
            timebase: FrameTimebase::new(recording_start_ns, recording_fps),
            baseline: None,
            peak: None,
        }
    }

    /// Brightness context copied onto every converted event.
    pub fn with_calibration(mut self, baseline: Option<f64>, peak: Option<f64>) -> Self {
        self.baseline = baseline;
        self.peak = peak;
        self
    }

    pub fn to_shutter_event(&self, event: &DetectedEvent) -> ShutterEvent {
        let start_frame = self.timebase.frame_at(event.start_timestamp_ns);
        let end_frame = self.timebase.frame_at(event.end_timestamp_ns);
        ShutterEvent::new(start_frame, end_frame, event.brightness_values.clone())
            .with_calibration(self.baseline, self.peak)
    }

    pub fn convert_all<'a>(
        &self,
        events: impl IntoIterator<Item = &'a DetectedEvent>,
    ) -> Vec<ShutterEvent> {
        events.into_iter().map(|e| self.to_shutter_event(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_frame() {
        // 1 s into a 240 fps recording
        assert_eq!(timestamp_to_frame(1_500_000_000, 500_000_000, 240.0), 240);
        // floor, not round
        assert_eq!(timestamp_to_frame(6_000_000, 0, 240.0), 1);
    }

    #[test]
    fn test_timestamp_before_start_clamps_to_zero() {
        assert_eq!(timestamp_to_frame(100, 1_000, 240.0), 0);
        assert_eq!(timestamp_to_frame(i64::MIN, i64::MAX, 240.0), 0);
    }

    #[test]
    fn test_invalid_fps_maps_to_frame_zero() {
        assert_eq!(timestamp_to_frame(5_000_000_000, 0, 0.0), 0);
        assert_eq!(timestamp_to_frame(5_000_000_000, 0, -60.0), 0);
        assert_eq!(timestamp_to_frame(5_000_000_000, 0, f64::NAN), 0);
    }

    #[test]
    fn test_converts_event_with_calibration() {
        let converter = EventConverter::new(1_000_000_000, 1000.0)
            .with_calibration(Some(20.0), Some(220.0));
        let detected = DetectedEvent {
            start_timestamp_ns: 1_010_500_000,
            end_timestamp_ns: 1_014_500_000,
            brightness_values: vec![200.0, 210.0, 220.0, 210.0, 200.0],
        };

        let event = converter.to_shutter_event(&detected);
        assert_eq!(event.start_frame, 10);
        assert_eq!(event.end_frame, 14);
        assert_eq!(event.duration_frames(), 5);
        assert_eq!(event.brightness_values, detected.brightness_values);
        assert_eq!(event.baseline_brightness, Some(20.0));
        assert_eq!(event.peak_brightness, Some(220.0));
    }

    #[test]
    fn test_frame_start_timestamps_keep_their_frame() {
        // frame starts at 240fps fall between whole nanoseconds
        let converter = EventConverter::new(1_000_000_000, 240.0);
        let timebase = FrameTimebase::new(1_000_000_000, 240.0);
        let detected = DetectedEvent {
            start_timestamp_ns: timebase.timestamp_of(1),
            end_timestamp_ns: timebase.timestamp_of(24),
            brightness_values: vec![200.0; 24],
        };

        let event = converter.to_shutter_event(&detected);
        assert_eq!((event.start_frame, event.end_frame), (1, 24));
        assert_eq!(event.duration_frames(), 24);
    }

    #[test]
    fn test_event_before_recording_start_stays_ordered() {
        let converter = EventConverter::new(10_000, 240.0);
        let detected = DetectedEvent {
            start_timestamp_ns: 0,
            end_timestamp_ns: 5_000,
            brightness_values: vec![200.0],
        };
        let event = converter.to_shutter_event(&detected);
        assert_eq!((event.start_frame, event.end_frame), (0, 0));
    }

    #[test]
    fn test_convert_all_preserves_order() {
        let converter = EventConverter::new(0, 100.0);
        let events = vec![
            DetectedEvent {
                start_timestamp_ns: 105_000_000,
                end_timestamp_ns: 125_000_000,
                brightness_values: vec![1.0, 1.0, 1.0],
            },
            DetectedEvent {
                start_timestamp_ns: 505_000_000,
                end_timestamp_ns: 505_000_000,
                brightness_values: vec![1.0],
            },
        ];
        let converted = converter.convert_all(&events);
        assert_eq!(converted[0].start_frame, 10);
        assert_eq!(converted[0].end_frame, 12);
        assert_eq!(converted[1].start_frame, 50);
    }
}
