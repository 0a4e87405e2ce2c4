//! Offline analysis of a whole brightness trace.

use std::path::PathBuf;

use shutterscope_processing_core::speed::{match_expected, parse_speed_list};
use shutterscope_processing_core::{OfflineAnalyzer, OfflineConfig, ThresholdMethod};

use crate::report::{self, TimelinePoint};

pub struct ScanArgs {
    pub trace: PathBuf,
    pub percentile: f64,
    pub margin: f64,
    pub zscore_events: Option<usize>,
    pub recording_fps: Option<f64>,
    pub expected: Option<String>,
    pub timeline: Option<PathBuf>,
    pub json: bool,
}

pub fn run(args: ScanArgs) -> anyhow::Result<()> {
    let ScanArgs {
        trace,
        percentile,
        margin,
        zscore_events,
        recording_fps,
        expected,
        timeline,
        json,
    } = args;

    let loaded = super::load_trace(&trace)?;
    let recording_fps = super::resolve_recording_fps(&loaded, recording_fps)?;
    let expected = expected
        .as_deref()
        .map(parse_speed_list)
        .transpose()?
        .unwrap_or_default();

    let method = match zscore_events {
        Some(expected_events) => ThresholdMethod::ZScore { expected_events },
        None => ThresholdMethod::Margin {
            margin_factor: margin,
        },
    };
    let analyzer = OfflineAnalyzer::new(OfflineConfig {
        method,
        baseline_percentile: percentile,
        ..Default::default()
    });
    let mut analysis = analyzer.analyze(&loaded.brightness_values())?;

    if let Some(ref path) = timeline {
        let points: Vec<_> = loaded
            .samples
            .iter()
            .enumerate()
            .map(|(frame, s)| TimelinePoint {
                frame: frame as u64,
                timestamp_ns: s.timestamp_ns,
                brightness: s.brightness,
            })
            .collect();
        super::write_timeline(path, &points, analysis.threshold, &analysis.events)?;
    }

    if !expected.is_empty() {
        analysis.events = match_expected(&analysis.events, &expected, recording_fps);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    let dist = &analysis.distribution;
    println!("Scanning trace: {}", trace.display());
    println!("  Samples: {}", loaded.samples.len());
    println!("  Recording FPS: {recording_fps}");
    println!(
        "  Brightness: min {:.2}, median {:.2}, mean {:.2}, max {:.2}",
        dist.min, dist.median, dist.mean, dist.max
    );
    let percentiles = dist
        .percentiles
        .iter()
        .map(|(p, v)| format!("p{p} {v:.2}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!("  Percentiles: {percentiles}");
    println!("  Baseline: {:.2}", analysis.baseline);
    println!("  Threshold: {:.2}", analysis.threshold);
    if let Some(peak) = analysis.peak {
        println!("  Peak: {peak:.2}");
    }
    println!();

    println!("Found {} shutter events", analysis.events.len());
    if !analysis.events.is_empty() {
        println!();
        println!(
            "{}",
            report::results_table(&analysis.events, recording_fps, report::use_color())
        );
    }

    Ok(())
}
