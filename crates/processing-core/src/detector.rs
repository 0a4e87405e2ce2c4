//! Live shutter event detection.
//!
//! A single owned state machine consumes one `(brightness, timestamp)` pair
//! per frame and reports what changed through the [`FrameOutcome`] returned
//! from [`LiveEventDetector::process_frame`].
//!
//! # Phases
//!
//! 1. **Baseline calibration**: the first `calibration_frame_count` frames
//!    are buffered with the shutter closed; their median becomes the
//!    baseline (robust to flicker spikes).
//! 2. **Awaiting calibration shutter**: the user fires the shutter once.
//!    Brightness above `baseline + bootstrap_margin` opens a capture.
//! 3. **Capturing calibration event**: samples are collected until the
//!    brightness falls back. The maximum becomes the peak and the threshold
//!    is placed `threshold_factor` of the way from baseline to peak. This
//!    event is only used for learning and is never reported.
//! 4. **Calibrated**: every span of frames above threshold is reported as
//!    a [`DetectedEvent`] once the brightness drops back to or below it.
//!
//! The alternate [`CalibrationPolicy::FixedMargin`] skips phases 2 and 3
//! and places the threshold at a multiple of the baseline.

use serde::{Deserialize, Serialize};
use shutterscope_measurement_model::stats;
use shutterscope_measurement_model::{DetectedEvent, TimestampNs};

/// How the threshold is learned once the baseline is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalibrationPolicy {
    /// Learn the open-shutter peak from one calibration actuation.
    PeakLearning,

    /// Single-phase: `threshold = baseline × margin_factor`.
    FixedMargin { margin_factor: f64 },
}

/// Configuration for the live detector. Fixed for the detector's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Closed-shutter frames used to learn the baseline.
    pub calibration_frame_count: usize,

    /// Threshold position between baseline (0.0) and peak (1.0), in `(0, 1]`.
    pub threshold_factor: f64,

    /// Rise above baseline that starts the calibration capture.
    pub bootstrap_margin: f64,

    /// Minimum distance between threshold and baseline, so a flat
    /// calibration signal never makes every frame count as open.
    pub min_threshold_margin: f64,

    pub policy: CalibrationPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            calibration_frame_count: 30,
            threshold_factor: 0.8,
            bootstrap_margin: 10.0,
            min_threshold_margin: 1.0,
            policy: CalibrationPolicy::PeakLearning,
        }
    }
}

impl DetectorConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), DetectorConfigError> {
        if self.calibration_frame_count == 0 {
            return Err(DetectorConfigError::CalibrationFrameCount);
        }
        if !(self.threshold_factor > 0.0 && self.threshold_factor <= 1.0) {
            return Err(DetectorConfigError::ThresholdFactor(self.threshold_factor));
        }
        if !(self.bootstrap_margin.is_finite() && self.bootstrap_margin >= 0.0) {
            return Err(DetectorConfigError::Margin {
                name: "bootstrap_margin",
                value: self.bootstrap_margin,
            });
        }
        if !(self.min_threshold_margin.is_finite() && self.min_threshold_margin > 0.0) {
            return Err(DetectorConfigError::Margin {
                name: "min_threshold_margin",
                value: self.min_threshold_margin,
            });
        }
        if let CalibrationPolicy::FixedMargin { margin_factor } = self.policy {
            if !(margin_factor.is_finite() && margin_factor >= 1.0) {
                return Err(DetectorConfigError::MarginFactor(margin_factor));
            }
        }
        Ok(())
    }
}

/// Rejected detector configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DetectorConfigError {
    #[error("calibration_frame_count must be positive")]
    CalibrationFrameCount,

    #[error("threshold_factor must be within (0, 1], got {0}")]
    ThresholdFactor(f64),

    #[error("{name} is out of range: {value}")]
    Margin { name: &'static str, value: f64 },

    #[error("margin_factor must be finite and at least 1.0, got {0}")]
    MarginFactor(f64),
}

impl From<DetectorConfigError> for shutterscope_common::ShutterscopeError {
    fn from(err: DetectorConfigError) -> Self {
        Self::invalid_argument(err.to_string())
    }
}

/// What a single processed frame produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Nothing externally visible changed.
    None,

    /// The baseline buffer filled and the baseline is known.
    BaselineCalibrationComplete { baseline: f64 },

    /// The threshold is known; event detection is now active.
    CalibrationComplete { baseline: f64, threshold: f64 },

    /// An above-threshold span just closed.
    EventDetected(DetectedEvent),
}

/// Externally observable detector phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorPhase {
    BaselineCalibrating,
    AwaitingCalibrationShutter,
    CapturingCalibrationEvent,
    Calibrated,
    /// Calibrated with an above-threshold span currently open.
    EventInProgress,
}

/// Frozen calibration result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub baseline: f64,
    /// `None` under the fixed-margin policy.
    pub peak: Option<f64>,
    pub threshold: f64,
}

/// Samples collected while brightness stays above a level.
#[derive(Debug, Clone)]
struct EventAccumulator {
    start_timestamp_ns: TimestampNs,
    last_timestamp_ns: TimestampNs,
    values: Vec<f64>,
}

impl EventAccumulator {
    fn open(brightness: f64, timestamp_ns: TimestampNs) -> Self {
        Self {
            start_timestamp_ns: timestamp_ns,
            last_timestamp_ns: timestamp_ns,
            values: vec![brightness],
        }
    }

    fn push(&mut self, brightness: f64, timestamp_ns: TimestampNs) {
        self.values.push(brightness);
        self.last_timestamp_ns = timestamp_ns;
    }

    fn close(self) -> DetectedEvent {
        DetectedEvent {
            start_timestamp_ns: self.start_timestamp_ns,
            end_timestamp_ns: self.last_timestamp_ns,
            brightness_values: self.values,
        }
    }
}

#[derive(Debug, Clone)]
enum DetectorState {
    BaselineCalibrating {
        samples: Vec<f64>,
    },
    AwaitingCalibrationShutter {
        baseline: f64,
    },
    CapturingCalibrationEvent {
        baseline: f64,
        capture: EventAccumulator,
    },
    Calibrated {
        calibration: Calibration,
        open_event: Option<EventAccumulator>,
    },
}

/// Online calibration and event segmentation over a brightness stream.
///
/// Frames must be delivered in increasing timestamp order by one owner.
#[derive(Debug, Clone)]
pub struct LiveEventDetector {
    config: DetectorConfig,
    state: DetectorState,
    detected_event_count: u64,
}

impl LiveEventDetector {
    /// Create a detector, rejecting out-of-range configuration.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorConfigError> {
        config.validate()?;
        Ok(Self {
            state: Self::initial_state(&config),
            config,
            detected_event_count: 0,
        })
    }

    /// Create a detector with default configuration.
    pub fn with_defaults() -> Self {
        let config = DetectorConfig::default();
        Self {
            state: Self::initial_state(&config),
            config,
            detected_event_count: 0,
        }
    }

    fn initial_state(config: &DetectorConfig) -> DetectorState {
        DetectorState::BaselineCalibrating {
            samples: Vec::with_capacity(config.calibration_frame_count),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Feed one frame.
    pub fn process_frame(&mut self, brightness: f64, timestamp_ns: TimestampNs) -> FrameOutcome {
        let state = std::mem::replace(
            &mut self.state,
            DetectorState::AwaitingCalibrationShutter { baseline: 0.0 },
        );

        let (next, outcome) = match state {
            DetectorState::BaselineCalibrating { samples } => {
                self.on_baseline_frame(samples, brightness)
            }
            DetectorState::AwaitingCalibrationShutter { baseline } => {
                self.on_awaiting_frame(baseline, brightness, timestamp_ns)
            }
            DetectorState::CapturingCalibrationEvent { baseline, capture } => {
                self.on_capture_frame(baseline, capture, brightness, timestamp_ns)
            }
            DetectorState::Calibrated {
                calibration,
                open_event,
            } => self.on_calibrated_frame(calibration, open_event, brightness, timestamp_ns),
        };

        self.state = next;
        outcome
    }

    fn on_baseline_frame(
        &mut self,
        mut samples: Vec<f64>,
        brightness: f64,
    ) -> (DetectorState, FrameOutcome) {
        samples.push(brightness);
        if samples.len() < self.config.calibration_frame_count {
            return (
                DetectorState::BaselineCalibrating { samples },
                FrameOutcome::None,
            );
        }

        let baseline = stats::median(&samples);
        match self.config.policy {
            CalibrationPolicy::PeakLearning => {
                tracing::info!(
                    baseline,
                    frames = samples.len(),
                    "Baseline calibration complete"
                );
                (
                    DetectorState::AwaitingCalibrationShutter { baseline },
                    FrameOutcome::BaselineCalibrationComplete { baseline },
                )
            }
            CalibrationPolicy::FixedMargin { margin_factor } => {
                let threshold = self.floor_threshold(baseline, baseline * margin_factor);
                tracing::info!(baseline, threshold, "Fixed-margin calibration complete");
                (
                    DetectorState::Calibrated {
                        calibration: Calibration {
                            baseline,
                            peak: None,
                            threshold,
                        },
                        open_event: None,
                    },
                    FrameOutcome::CalibrationComplete {
                        baseline,
                        threshold,
                    },
                )
            }
        }
    }

    fn on_awaiting_frame(
        &mut self,
        baseline: f64,
        brightness: f64,
        timestamp_ns: TimestampNs,
    ) -> (DetectorState, FrameOutcome) {
        if brightness > self.bootstrap_level(baseline) {
            tracing::debug!(brightness, "Calibration actuation started");
            (
                DetectorState::CapturingCalibrationEvent {
                    baseline,
                    capture: EventAccumulator::open(brightness, timestamp_ns),
                },
                FrameOutcome::None,
            )
        } else {
            (
                DetectorState::AwaitingCalibrationShutter { baseline },
                FrameOutcome::None,
            )
        }
    }

    fn on_capture_frame(
        &mut self,
        baseline: f64,
        mut capture: EventAccumulator,
        brightness: f64,
        timestamp_ns: TimestampNs,
    ) -> (DetectorState, FrameOutcome) {
        if brightness > self.bootstrap_level(baseline) {
            capture.push(brightness, timestamp_ns);
            return (
                DetectorState::CapturingCalibrationEvent { baseline, capture },
                FrameOutcome::None,
            );
        }

        let peak = stats::max(&capture.values);
        let placed = baseline + self.config.threshold_factor * (peak - baseline);
        let threshold = self.floor_threshold(baseline, placed);
        tracing::info!(
            baseline,
            peak,
            threshold,
            frames = capture.values.len(),
            "Calibration complete"
        );

        (
            DetectorState::Calibrated {
                calibration: Calibration {
                    baseline,
                    peak: Some(peak),
                    threshold,
                },
                open_event: None,
            },
            FrameOutcome::CalibrationComplete {
                baseline,
                threshold,
            },
        )
    }

    fn on_calibrated_frame(
        &mut self,
        calibration: Calibration,
        open_event: Option<EventAccumulator>,
        brightness: f64,
        timestamp_ns: TimestampNs,
    ) -> (DetectorState, FrameOutcome) {
        let is_open = brightness > calibration.threshold;

        match (open_event, is_open) {
            (None, true) => (
                DetectorState::Calibrated {
                    calibration,
                    open_event: Some(EventAccumulator::open(brightness, timestamp_ns)),
                },
                FrameOutcome::None,
            ),
            (Some(mut event), true) => {
                event.push(brightness, timestamp_ns);
                (
                    DetectorState::Calibrated {
                        calibration,
                        open_event: Some(event),
                    },
                    FrameOutcome::None,
                )
            }
            (Some(event), false) => {
                let detected = event.close();
                self.detected_event_count += 1;
                tracing::debug!(
                    start_ns = detected.start_timestamp_ns,
                    end_ns = detected.end_timestamp_ns,
                    frames = detected.brightness_values.len(),
                    count = self.detected_event_count,
                    "Shutter event detected"
                );
                (
                    DetectorState::Calibrated {
                        calibration,
                        open_event: None,
                    },
                    FrameOutcome::EventDetected(detected),
                )
            }
            (None, false) => (
                DetectorState::Calibrated {
                    calibration,
                    open_event: None,
                },
                FrameOutcome::None,
            ),
        }
    }

    fn bootstrap_level(&self, baseline: f64) -> f64 {
        baseline + self.config.bootstrap_margin
    }

    fn floor_threshold(&self, baseline: f64, threshold: f64) -> f64 {
        threshold.max(baseline + self.config.min_threshold_margin)
    }

    /// Return to baseline calibration, forgetting everything learned.
    pub fn reset(&mut self) {
        self.state = Self::initial_state(&self.config);
        self.detected_event_count = 0;
        tracing::debug!("Detector reset");
    }

    /// Drop the event count and any open span while keeping calibration.
    ///
    /// A calibration capture in progress is abandoned and the detector waits
    /// for a fresh calibration actuation.
    pub fn reset_events(&mut self) {
        self.detected_event_count = 0;
        self.state = match std::mem::replace(
            &mut self.state,
            DetectorState::AwaitingCalibrationShutter { baseline: 0.0 },
        ) {
            DetectorState::Calibrated { calibration, .. } => DetectorState::Calibrated {
                calibration,
                open_event: None,
            },
            DetectorState::CapturingCalibrationEvent { baseline, .. } => {
                DetectorState::AwaitingCalibrationShutter { baseline }
            }
            other => other,
        };
    }

    /// Current phase.
    pub fn phase(&self) -> DetectorPhase {
        match &self.state {
            DetectorState::BaselineCalibrating { .. } => DetectorPhase::BaselineCalibrating,
            DetectorState::AwaitingCalibrationShutter { .. } => {
                DetectorPhase::AwaitingCalibrationShutter
            }
            DetectorState::CapturingCalibrationEvent { .. } => {
                DetectorPhase::CapturingCalibrationEvent
            }
            DetectorState::Calibrated {
                open_event: Some(_),
                ..
            } => DetectorPhase::EventInProgress,
            DetectorState::Calibrated { .. } => DetectorPhase::Calibrated,
        }
    }

    /// Calibration progress in `[0.0, 1.0]`.
    ///
    /// Baseline collection covers `[0.0, 0.5)`, waiting for and capturing
    /// the calibration actuation reports `0.5`, calibrated reports `1.0`.
    pub fn progress(&self) -> f64 {
        match &self.state {
            DetectorState::BaselineCalibrating { samples } => {
                samples.len() as f64 / (2 * self.config.calibration_frame_count) as f64
            }
            DetectorState::AwaitingCalibrationShutter { .. }
            | DetectorState::CapturingCalibrationEvent { .. } => 0.5,
            DetectorState::Calibrated { .. } => 1.0,
        }
    }

    /// Learned calibration, once calibrated.
    pub fn calibration(&self) -> Option<Calibration> {
        match &self.state {
            DetectorState::Calibrated { calibration, .. } => Some(*calibration),
            _ => None,
        }
    }

    /// Baseline, once the baseline phase has completed.
    pub fn baseline(&self) -> Option<f64> {
        match &self.state {
            DetectorState::BaselineCalibrating { .. } => None,
            DetectorState::AwaitingCalibrationShutter { baseline }
            | DetectorState::CapturingCalibrationEvent { baseline, .. } => Some(*baseline),
            DetectorState::Calibrated { calibration, .. } => Some(calibration.baseline),
        }
    }

    /// Threshold, once calibrated.
    pub fn threshold(&self) -> Option<f64> {
        self.calibration().map(|c| c.threshold)
    }

    /// Frames buffered toward the baseline so far.
    pub fn frames_seen(&self) -> usize {
        match &self.state {
            DetectorState::BaselineCalibrating { samples } => samples.len(),
            _ => self.config.calibration_frame_count,
        }
    }

    pub fn target_frame_count(&self) -> usize {
        self.config.calibration_frame_count
    }

    /// Events reported since the last reset.
    pub fn detected_event_count(&self) -> u64 {
        self.detected_event_count
    }

    pub fn is_event_in_progress(&self) -> bool {
        self.phase() == DetectorPhase::EventInProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_NS: i64 = 4_166_667; // 240fps

    /// Feeds `values` starting at frame `*frame`, collecting outcomes.
    fn feed(
        detector: &mut LiveEventDetector,
        frame: &mut i64,
        values: &[f64],
    ) -> Vec<FrameOutcome> {
        values
            .iter()
            .map(|&b| {
                let outcome = detector.process_frame(b, *frame * FRAME_NS);
                *frame += 1;
                outcome
            })
            .collect()
    }

    fn detector_with(frames: usize) -> LiveEventDetector {
        LiveEventDetector::new(DetectorConfig {
            calibration_frame_count: frames,
            ..Default::default()
        })
        .unwrap()
    }

    /// Baseline 20, calibration actuation peaking at 220 → threshold 180.
    fn calibrated_detector(frame: &mut i64) -> LiveEventDetector {
        let mut detector = detector_with(10);
        feed(&mut detector, frame, &[20.0; 10]);
        feed(&mut detector, frame, &[150.0, 220.0, 140.0, 20.0]);
        assert_eq!(detector.phase(), DetectorPhase::Calibrated);
        detector
    }

    #[test]
    fn test_progress_during_baseline() {
        let mut detector = detector_with(10);
        let mut frame = 0;
        for k in 1..10 {
            let outcomes = feed(&mut detector, &mut frame, &[20.0]);
            assert_eq!(outcomes, vec![FrameOutcome::None]);
            assert!((detector.progress() - k as f64 / 20.0).abs() < 1e-12);
            assert_eq!(detector.frames_seen(), k);
        }
        let outcomes = feed(&mut detector, &mut frame, &[20.0]);
        assert_eq!(
            outcomes,
            vec![FrameOutcome::BaselineCalibrationComplete { baseline: 20.0 }]
        );
        assert_eq!(detector.phase(), DetectorPhase::AwaitingCalibrationShutter);
        assert_eq!(detector.progress(), 0.5);
    }

    #[test]
    fn test_baseline_is_median_not_mean() {
        let mut detector = detector_with(5);
        let mut frame = 0;
        feed(&mut detector, &mut frame, &[20.0, 21.0, 250.0, 19.0, 20.0]);
        assert_eq!(detector.baseline(), Some(20.0));
    }

    #[test]
    fn test_calibration_places_threshold_between_baseline_and_peak() {
        let mut frame = 0;
        let mut detector = detector_with(10);
        feed(&mut detector, &mut frame, &[20.0; 10]);

        let outcomes = feed(&mut detector, &mut frame, &[25.0, 150.0]);
        assert_eq!(outcomes, vec![FrameOutcome::None, FrameOutcome::None]);
        assert_eq!(detector.phase(), DetectorPhase::CapturingCalibrationEvent);
        assert_eq!(detector.progress(), 0.5);

        let outcomes = feed(&mut detector, &mut frame, &[220.0, 140.0, 20.0]);
        let expected_threshold = 20.0 + 0.8 * (220.0 - 20.0);
        assert_eq!(
            outcomes.last().unwrap(),
            &FrameOutcome::CalibrationComplete {
                baseline: 20.0,
                threshold: expected_threshold,
            }
        );
        let calibration = detector.calibration().unwrap();
        assert_eq!(calibration.peak, Some(220.0));
        assert_eq!(detector.progress(), 1.0);
        // the calibration actuation is never reported
        assert_eq!(detector.detected_event_count(), 0);
    }

    #[test]
    fn test_single_event_excludes_terminating_frame() {
        let mut frame = 0;
        let mut detector = calibrated_detector(&mut frame);

        let first_bright = frame * FRAME_NS;
        let outcomes = feed(&mut detector, &mut frame, &[200.0, 200.0, 20.0]);
        assert_eq!(outcomes[0], FrameOutcome::None);
        assert_eq!(outcomes[1], FrameOutcome::None);
        match &outcomes[2] {
            FrameOutcome::EventDetected(event) => {
                assert_eq!(event.brightness_values, vec![200.0, 200.0]);
                assert_eq!(event.start_timestamp_ns, first_bright);
                assert_eq!(event.end_timestamp_ns, first_bright + FRAME_NS);
            }
            other => panic!("expected event, got {other:?}"),
        }
        assert_eq!(detector.detected_event_count(), 1);
    }

    #[test]
    fn test_event_in_progress_phase() {
        let mut frame = 0;
        let mut detector = calibrated_detector(&mut frame);
        feed(&mut detector, &mut frame, &[210.0]);
        assert!(detector.is_event_in_progress());
        feed(&mut detector, &mut frame, &[20.0]);
        assert_eq!(detector.phase(), DetectorPhase::Calibrated);
    }

    #[test]
    fn test_brightness_equal_to_threshold_is_closed() {
        let mut frame = 0;
        let mut detector = calibrated_detector(&mut frame);
        let threshold = detector.threshold().unwrap();
        let outcomes = feed(&mut detector, &mut frame, &[threshold, threshold]);
        assert!(outcomes.iter().all(|o| *o == FrameOutcome::None));
        assert!(!detector.is_event_in_progress());
    }

    #[test]
    fn test_counts_each_cycle_once() {
        let mut frame = 0;
        let mut detector = calibrated_detector(&mut frame);
        let outcomes = feed(
            &mut detector,
            &mut frame,
            &[200.0, 20.0, 20.0, 230.0, 240.0, 230.0, 20.0, 200.0, 20.0],
        );
        let events: Vec<_> = outcomes
            .into_iter()
            .filter_map(|o| match o {
                FrameOutcome::EventDetected(e) => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].brightness_values, vec![230.0, 240.0, 230.0]);
        assert_eq!(detector.detected_event_count(), 3);
    }

    #[test]
    fn test_flat_calibration_still_separates_threshold() {
        let mut frame = 0;
        let mut detector = LiveEventDetector::new(DetectorConfig {
            calibration_frame_count: 10,
            bootstrap_margin: 0.0,
            threshold_factor: 0.01,
            ..Default::default()
        })
        .unwrap();
        feed(&mut detector, &mut frame, &[20.0; 10]);
        // barely-above actuation: 0.01 * 0.2 would sit on the baseline noise
        feed(&mut detector, &mut frame, &[20.2, 20.0]);
        let calibration = detector.calibration().unwrap();
        assert!(calibration.threshold > calibration.baseline);
        assert_eq!(calibration.threshold, 21.0);

        // flat input at baseline never opens an event
        let outcomes = feed(&mut detector, &mut frame, &[20.0; 50]);
        assert!(outcomes.iter().all(|o| *o == FrameOutcome::None));
    }

    #[test]
    fn test_fixed_margin_policy_detects_first_bright_span() {
        let mut detector = LiveEventDetector::new(DetectorConfig {
            calibration_frame_count: 10,
            policy: CalibrationPolicy::FixedMargin { margin_factor: 1.5 },
            ..Default::default()
        })
        .unwrap();
        let mut frame = 0;

        let outcomes = feed(&mut detector, &mut frame, &[20.0; 10]);
        assert_eq!(
            outcomes.last().unwrap(),
            &FrameOutcome::CalibrationComplete {
                baseline: 20.0,
                threshold: 30.0,
            }
        );

        let outcomes = feed(&mut detector, &mut frame, &[200.0, 200.0, 20.0]);
        let events: Vec<_> = outcomes
            .iter()
            .filter_map(|o| match o {
                FrameOutcome::EventDetected(e) => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].brightness_values, vec![200.0, 200.0]);
        assert_eq!(events[0].start_timestamp_ns, 10 * FRAME_NS);
        assert_eq!(events[0].end_timestamp_ns, 11 * FRAME_NS);
    }

    #[test]
    fn test_fixed_margin_on_black_baseline_uses_minimum_margin() {
        let mut detector = LiveEventDetector::new(DetectorConfig {
            calibration_frame_count: 3,
            policy: CalibrationPolicy::FixedMargin { margin_factor: 2.0 },
            ..Default::default()
        })
        .unwrap();
        let mut frame = 0;
        feed(&mut detector, &mut frame, &[0.0; 3]);
        assert_eq!(detector.threshold(), Some(1.0));
    }

    #[test]
    fn test_reset_returns_to_baseline_calibration() {
        let mut frame = 0;
        let mut detector = calibrated_detector(&mut frame);
        feed(&mut detector, &mut frame, &[200.0, 20.0, 200.0]);
        assert_eq!(detector.detected_event_count(), 1);

        detector.reset();
        assert_eq!(detector.phase(), DetectorPhase::BaselineCalibrating);
        assert_eq!(detector.detected_event_count(), 0);
        assert_eq!(detector.frames_seen(), 0);
        assert_eq!(detector.progress(), 0.0);
        assert!(detector.baseline().is_none());
    }

    #[test]
    fn test_reset_events_keeps_calibration() {
        let mut frame = 0;
        let mut detector = calibrated_detector(&mut frame);
        let before = detector.calibration().unwrap();

        feed(&mut detector, &mut frame, &[200.0, 20.0, 200.0]);
        assert!(detector.is_event_in_progress());

        detector.reset_events();
        assert_eq!(detector.detected_event_count(), 0);
        assert!(!detector.is_event_in_progress());
        assert_eq!(detector.calibration(), Some(before));

        // the discarded span does not leak into the next event
        let outcomes = feed(&mut detector, &mut frame, &[20.0, 210.0, 20.0]);
        match &outcomes[2] {
            FrameOutcome::EventDetected(e) => assert_eq!(e.brightness_values, vec![210.0]),
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_events_abandons_calibration_capture() {
        let mut frame = 0;
        let mut detector = detector_with(4);
        feed(&mut detector, &mut frame, &[20.0; 4]);
        feed(&mut detector, &mut frame, &[180.0]);
        assert_eq!(detector.phase(), DetectorPhase::CapturingCalibrationEvent);

        detector.reset_events();
        assert_eq!(detector.phase(), DetectorPhase::AwaitingCalibrationShutter);
        assert_eq!(detector.baseline(), Some(20.0));
    }

    #[test]
    fn test_reset_events_during_baseline_keeps_buffer() {
        let mut frame = 0;
        let mut detector = detector_with(4);
        feed(&mut detector, &mut frame, &[20.0; 2]);
        detector.reset_events();
        assert_eq!(detector.frames_seen(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = |config: DetectorConfig| LiveEventDetector::new(config).unwrap_err();

        assert_eq!(
            bad(DetectorConfig {
                calibration_frame_count: 0,
                ..Default::default()
            }),
            DetectorConfigError::CalibrationFrameCount
        );
        assert!(matches!(
            bad(DetectorConfig {
                threshold_factor: 1.5,
                ..Default::default()
            }),
            DetectorConfigError::ThresholdFactor(_)
        ));
        assert!(matches!(
            bad(DetectorConfig {
                threshold_factor: 0.0,
                ..Default::default()
            }),
            DetectorConfigError::ThresholdFactor(_)
        ));
        assert!(matches!(
            bad(DetectorConfig {
                min_threshold_margin: 0.0,
                ..Default::default()
            }),
            DetectorConfigError::Margin { .. }
        ));
        assert!(matches!(
            bad(DetectorConfig {
                policy: CalibrationPolicy::FixedMargin { margin_factor: 0.5 },
                ..Default::default()
            }),
            DetectorConfigError::MarginFactor(_)
        ));
    }

    #[test]
    fn test_policy_serialization() {
        let json = serde_json::to_string(&CalibrationPolicy::FixedMargin { margin_factor: 1.5 })
            .unwrap();
        assert_eq!(json, r#"{"kind":"fixed_margin","margin_factor":1.5}"#);
    }
}
