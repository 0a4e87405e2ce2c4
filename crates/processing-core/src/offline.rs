//! Whole-trace analysis of a finished recording.
//!
//! Unlike the live detector, the offline analyzer sees every brightness
//! value up front. It derives the baseline from a low percentile of the
//! whole trace, picks a threshold, segments events, and estimates the
//! open-shutter peak from the events' plateaus.

use serde::{Deserialize, Serialize};
use shutterscope_common::{ShutterscopeError, ShutterscopeResult};
use shutterscope_measurement_model::{stats, ShutterEvent};

/// Percentiles reported in a [`BrightnessDistribution`].
pub const REPORTED_PERCENTILES: [u8; 4] = [10, 25, 75, 90];

/// Summary of every brightness value in a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrightnessDistribution {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// `(percentile, value)` for each of [`REPORTED_PERCENTILES`].
    pub percentiles: Vec<(u8, f64)>,
}

impl BrightnessDistribution {
    pub fn from_values(values: &[f64]) -> ShutterscopeResult<Self> {
        if values.is_empty() {
            return Err(ShutterscopeError::analysis("no brightness values to analyze"));
        }

        let percentiles = REPORTED_PERCENTILES
            .iter()
            .map(|&p| Ok((p, percentile_of(values, p as f64)?)))
            .collect::<ShutterscopeResult<Vec<_>>>()?;

        Ok(Self {
            min: stats::min(values),
            max: stats::max(values),
            mean: stats::mean(values),
            median: stats::median(values),
            percentiles,
        })
    }

    /// Value at one of the reported percentiles.
    pub fn percentile(&self, p: u8) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|(q, _)| *q == p)
            .map(|(_, v)| *v)
    }
}

fn percentile_of(values: &[f64], p: f64) -> ShutterscopeResult<f64> {
    stats::percentile(values, p).map_err(|e| ShutterscopeError::invalid_argument(e.to_string()))
}

/// How the open/closed threshold is chosen from the whole trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ThresholdMethod {
    /// `baseline + (median − baseline) × margin_factor`.
    Margin { margin_factor: f64 },

    /// `mean + z·σ`, with `z` chosen so the number of above-threshold
    /// frames is closest to `expected_events`.
    ZScore { expected_events: usize },
}

impl Default for ThresholdMethod {
    fn default() -> Self {
        Self::Margin { margin_factor: 1.5 }
    }
}

/// Offline analysis parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OfflineConfig {
    pub method: ThresholdMethod,

    /// Percentile of the trace taken as the closed-shutter baseline, for
    /// either method.
    pub baseline_percentile: f64,

    /// Minimum distance between threshold and baseline.
    pub min_threshold_margin: f64,

    /// Fraction of an event's max that counts as plateau.
    pub plateau_fraction: f64,

    /// Plateau frames an event needs to contribute to the peak estimate.
    pub min_plateau_frames: usize,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            method: ThresholdMethod::default(),
            baseline_percentile: 25.0,
            min_threshold_margin: 1.0,
            plateau_fraction: 0.9,
            min_plateau_frames: 10,
        }
    }
}

/// A frame-indexed above-threshold span.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSpan {
    pub start_frame: u64,
    /// Inclusive.
    pub end_frame: u64,
    pub brightness_values: Vec<f64>,
}

/// Result of [`OfflineAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineReport {
    pub distribution: BrightnessDistribution,
    pub baseline: f64,
    pub threshold: f64,
    pub peak: Option<f64>,
    pub events: Vec<ShutterEvent>,
}

/// Split `values` into spans strictly above `threshold`. A span still open
/// on the last value is closed there.
pub fn find_events(values: &[f64], threshold: f64) -> Vec<EventSpan> {
    let mut events = Vec::new();
    let mut open: Option<EventSpan> = None;

    for (idx, &brightness) in values.iter().enumerate() {
        let frame = idx as u64;
        if brightness <= threshold {
            events.extend(open.take());
            continue;
        }
        match open.as_mut() {
            Some(span) => {
                span.end_frame = frame;
                span.brightness_values.push(brightness);
            }
            None => {
                open = Some(EventSpan {
                    start_frame: frame,
                    end_frame: frame,
                    brightness_values: vec![brightness],
                });
            }
        }
    }

    events.extend(open);
    events
}

/// Typical fully-open brightness across `events`.
///
/// Frames at or above `plateau_fraction` of their event's max form that
/// event's plateau. Events with at least `min_plateau_frames` plateau frames
/// contribute their plateau mean, and the median of those means is
/// returned. Without any qualifying event, the 95th percentile of every
/// event sample is used instead.
pub fn plateau_peak(
    events: &[EventSpan],
    plateau_fraction: f64,
    min_plateau_frames: usize,
) -> Option<f64> {
    let plateau_means: Vec<f64> = events
        .iter()
        .filter(|e| !e.brightness_values.is_empty())
        .filter_map(|e| {
            let cutoff = stats::max(&e.brightness_values) * plateau_fraction;
            let plateau: Vec<f64> = e
                .brightness_values
                .iter()
                .copied()
                .filter(|b| *b >= cutoff)
                .collect();
            (plateau.len() >= min_plateau_frames).then(|| stats::mean(&plateau))
        })
        .collect();

    if !plateau_means.is_empty() {
        return Some(stats::median(&plateau_means));
    }

    let all: Vec<f64> = events
        .iter()
        .flat_map(|e| e.brightness_values.iter().copied())
        .collect();
    if all.is_empty() {
        None
    } else {
        stats::percentile(&all, 95.0).ok()
    }
}

/// Threshold for `ThresholdMethod::Margin`, before the minimum margin.
pub fn margin_threshold(
    distribution: &BrightnessDistribution,
    baseline: f64,
    margin_factor: f64,
) -> f64 {
    let threshold = baseline + (distribution.median - baseline) * margin_factor;
    if threshold == baseline {
        baseline + (distribution.max - baseline) * 0.1
    } else {
        threshold
    }
}

/// Threshold for `ThresholdMethod::ZScore`.
pub fn zscore_threshold(values: &[f64], expected_events: usize) -> f64 {
    const STEPS: usize = 40;
    const Z_MIN: f64 = 1.0;
    const Z_MAX: f64 = 5.0;

    let mean = stats::mean(values);
    let sigma = stats::std_dev(values);
    if sigma < 1e-6 {
        return mean + 0.1;
    }

    let mut best_threshold = mean;
    let mut best_diff = usize::MAX;
    for step in 0..STEPS {
        let z = Z_MIN + (Z_MAX - Z_MIN) * step as f64 / (STEPS - 1) as f64;
        let threshold = mean + z * sigma;
        let above = values.iter().filter(|&&b| b > threshold).count();
        let diff = above.abs_diff(expected_events);
        if diff < best_diff {
            best_diff = diff;
            best_threshold = threshold;
        }
    }
    best_threshold
}

/// Batch analyzer over a complete brightness trace.
#[derive(Debug, Clone, Default)]
pub struct OfflineAnalyzer {
    config: OfflineConfig,
}

impl OfflineAnalyzer {
    pub fn new(config: OfflineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn analyze(&self, values: &[f64]) -> ShutterscopeResult<OfflineReport> {
        let distribution = BrightnessDistribution::from_values(values)?;

        let baseline = percentile_of(values, self.config.baseline_percentile)?;

        let raw_threshold = match self.config.method {
            ThresholdMethod::Margin { margin_factor } => {
                margin_threshold(&distribution, baseline, margin_factor)
            }
            ThresholdMethod::ZScore { expected_events } => {
                zscore_threshold(values, expected_events)
            }
        };
        let threshold = raw_threshold.max(baseline + self.config.min_threshold_margin);

        let spans = find_events(values, threshold);
        let peak = plateau_peak(
            &spans,
            self.config.plateau_fraction,
            self.config.min_plateau_frames,
        );

        tracing::info!(
            frames = values.len(),
            baseline,
            threshold,
            peak = peak.unwrap_or(f64::NAN),
            events = spans.len(),
            "Offline analysis complete"
        );

        let events = spans
            .into_iter()
            .map(|span| {
                ShutterEvent::new(span.start_frame, span.end_frame, span.brightness_values)
                    .with_calibration(Some(baseline), peak)
            })
            .collect();

        Ok(OfflineReport {
            distribution,
            baseline,
            threshold,
            peak,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100 dark frames with `count` bright bursts of `width` frames.
    fn synthetic(count: usize, width: usize) -> Vec<f64> {
        let mut values = vec![20.0; 100];
        for i in 0..count {
            let start = 10 + i * 20;
            for v in &mut values[start..start + width] {
                *v = 200.0;
            }
        }
        values
    }

    #[test]
    fn test_distribution() {
        let dist = BrightnessDistribution::from_values(&[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();
        assert_eq!(dist.min, 10.0);
        assert_eq!(dist.max, 50.0);
        assert_eq!(dist.mean, 30.0);
        assert_eq!(dist.median, 30.0);
        assert_eq!(dist.percentile(25), Some(20.0));
        assert_eq!(dist.percentile(75), Some(40.0));
        assert_eq!(dist.percentile(50), None);
    }

    #[test]
    fn test_distribution_rejects_empty() {
        assert!(matches!(
            BrightnessDistribution::from_values(&[]),
            Err(ShutterscopeError::Analysis { .. })
        ));
    }

    #[test]
    fn test_find_events() {
        let values = [20.0, 200.0, 210.0, 20.0, 20.0, 200.0, 20.0];
        let events = find_events(&values, 100.0);
        assert_eq!(events.len(), 2);
        assert_eq!((events[0].start_frame, events[0].end_frame), (1, 2));
        assert_eq!(events[0].brightness_values, vec![200.0, 210.0]);
        assert_eq!((events[1].start_frame, events[1].end_frame), (5, 5));
    }

    #[test]
    fn test_find_events_closes_trailing_span() {
        let events = find_events(&[20.0, 200.0, 200.0], 100.0);
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].start_frame, events[0].end_frame), (1, 2));
    }

    #[test]
    fn test_find_events_equal_to_threshold_is_closed() {
        assert!(find_events(&[100.0, 100.0], 100.0).is_empty());
    }

    #[test]
    fn test_plateau_peak_uses_qualifying_events() {
        let long = EventSpan {
            start_frame: 0,
            end_frame: 11,
            brightness_values: [vec![50.0], vec![200.0; 10], vec![60.0]].concat(),
        };
        let short = EventSpan {
            start_frame: 20,
            end_frame: 21,
            brightness_values: vec![255.0, 255.0],
        };
        assert_eq!(plateau_peak(&[long, short], 0.9, 10), Some(200.0));
    }

    #[test]
    fn test_plateau_peak_falls_back_to_p95() {
        let short = EventSpan {
            start_frame: 0,
            end_frame: 1,
            brightness_values: vec![100.0, 200.0],
        };
        // p95 of [100, 200] = 100 + 0.95 * 100
        let peak = plateau_peak(&[short], 0.9, 10).unwrap();
        assert!((peak - 195.0).abs() < 1e-9);
        assert_eq!(plateau_peak(&[], 0.9, 10), None);
    }

    #[test]
    fn test_margin_threshold_flat_median_falls_back() {
        // baseline equals median: threshold moves 10% toward max
        let dist = BrightnessDistribution::from_values(&[20.0, 20.0, 20.0, 220.0]).unwrap();
        assert_eq!(margin_threshold(&dist, 20.0, 1.5), 40.0);
    }

    #[test]
    fn test_zscore_threshold_uniform_trace() {
        assert!((zscore_threshold(&[50.0; 10], 3) - 50.1).abs() < 1e-9);
    }

    #[test]
    fn test_zscore_threshold_separates_bursts() {
        let values = synthetic(3, 2);
        let threshold = zscore_threshold(&values, 6);
        assert!(threshold > 20.0 && threshold < 200.0);
    }

    #[test]
    fn test_analyze_margin_method() {
        let values = synthetic(4, 3);
        let report = OfflineAnalyzer::default().analyze(&values).unwrap();
        assert_eq!(report.baseline, 20.0);
        // median is also 20, so 10% toward max
        assert_eq!(report.threshold, 38.0);
        assert_eq!(report.events.len(), 4);
        assert_eq!(report.events[0].start_frame, 10);
        assert_eq!(report.events[0].duration_frames(), 3);
        assert_eq!(report.events[0].baseline_brightness, Some(20.0));
        assert_eq!(report.peak, Some(200.0));
    }

    #[test]
    fn test_analyze_zscore_method() {
        let analyzer = OfflineAnalyzer::new(OfflineConfig {
            method: ThresholdMethod::ZScore { expected_events: 8 },
            ..Default::default()
        });
        let report = analyzer.analyze(&synthetic(4, 2)).unwrap();
        assert_eq!(report.events.len(), 4);
        assert!(report.events.iter().all(|e| e.duration_frames() == 2));
    }

    #[test]
    fn test_baseline_percentile_applies_to_zscore() {
        // 92 dark frames, 8 bright: p95 sits on the bright frames
        let analyzer = OfflineAnalyzer::new(OfflineConfig {
            method: ThresholdMethod::ZScore { expected_events: 8 },
            baseline_percentile: 95.0,
            ..Default::default()
        });
        let report = analyzer.analyze(&synthetic(4, 2)).unwrap();
        assert_eq!(report.baseline, 200.0);
        assert_eq!(report.threshold, 201.0);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_analyze_flat_trace_finds_nothing() {
        let report = OfflineAnalyzer::default().analyze(&[20.0; 50]).unwrap();
        assert_eq!(report.threshold, 21.0);
        assert!(report.events.is_empty());
        assert_eq!(report.peak, None);
    }
}
