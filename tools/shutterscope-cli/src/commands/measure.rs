//! Replay a brightness trace through the live detector.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shutterscope_common::{AppConfig, FrameTimebase, LatestValue, RateController};
use shutterscope_measurement_model::{
    BrightnessSample, CalibrationRecord, DetectedEvent, MeasurementSession, RecordingInfo,
};
use shutterscope_processing_core::speed::{match_expected, parse_speed_list};
use shutterscope_processing_core::{
    Calibration, CalibrationPolicy, DetectorConfig, DetectorPhase, EventConverter, FrameOutcome,
    LiveEventDetector,
};

use crate::report::{self, ReportHeader, TimelinePoint};

/// Rate at which replay snapshots are published to the progress reporter,
/// in trace time.
const STATUS_RATE_HZ: u32 = 20;

const REPORTER_POLL: Duration = Duration::from_millis(50);

pub struct MeasureArgs {
    pub trace: PathBuf,
    pub recording_fps: Option<f64>,
    pub calibration_frames: Option<usize>,
    pub threshold_factor: Option<f64>,
    pub bootstrap_margin: Option<f64>,
    pub fixed_margin: Option<f64>,
    pub expected: Option<String>,
    pub output: Option<PathBuf>,
    pub save: bool,
    pub markdown: Option<PathBuf>,
    pub timeline: Option<PathBuf>,
    pub name: String,
}

/// Snapshot of the replay handed to the progress reporter.
#[derive(Debug, Clone, Copy)]
struct ReplayStatus {
    frame: usize,
    total: usize,
    phase: DetectorPhase,
    calibration_progress: f64,
    events: u64,
}

/// What the replay worker hands back once the trace is exhausted.
struct ReplayOutcome {
    events: Vec<DetectedEvent>,
    calibration: Option<Calibration>,
    final_phase: DetectorPhase,
}

/// Build detector configuration from config-file defaults and CLI flags.
fn detector_config(config: &AppConfig, args: &MeasureArgs) -> DetectorConfig {
    let defaults = &config.detector;
    DetectorConfig {
        calibration_frame_count: args
            .calibration_frames
            .unwrap_or(defaults.calibration_frame_count),
        threshold_factor: args.threshold_factor.unwrap_or(defaults.threshold_factor),
        bootstrap_margin: args.bootstrap_margin.unwrap_or(defaults.bootstrap_margin),
        min_threshold_margin: defaults.min_threshold_margin,
        policy: match args.fixed_margin {
            Some(margin_factor) => CalibrationPolicy::FixedMargin { margin_factor },
            None => CalibrationPolicy::PeakLearning,
        },
    }
}

fn replay(
    mut detector: LiveEventDetector,
    samples: Vec<BrightnessSample>,
    status: LatestValue<ReplayStatus>,
) -> ReplayOutcome {
    let total = samples.len();
    let mut rate = RateController::new(STATUS_RATE_HZ);
    let mut events = Vec::new();
    let origin = samples.first().map(|s| s.timestamp_ns).unwrap_or(0);

    for (frame, sample) in samples.into_iter().enumerate() {
        match detector.process_frame(sample.brightness, sample.timestamp_ns) {
            FrameOutcome::None => {}
            FrameOutcome::BaselineCalibrationComplete { baseline } => {
                tracing::debug!(frame, baseline, "Waiting for calibration actuation");
            }
            FrameOutcome::CalibrationComplete {
                baseline,
                threshold,
            } => {
                tracing::debug!(frame, baseline, threshold, "Detector armed");
            }
            FrameOutcome::EventDetected(event) => events.push(event),
        }

        let trace_ns = sample.timestamp_ns.saturating_sub(origin).max(0) as u64;
        if rate.should_tick(trace_ns) || frame + 1 == total {
            status.publish(ReplayStatus {
                frame: frame + 1,
                total,
                phase: detector.phase(),
                calibration_progress: detector.progress(),
                events: detector.detected_event_count(),
            });
        }
    }

    ReplayOutcome {
        events,
        calibration: detector.calibration(),
        final_phase: detector.phase(),
    }
}

fn print_status(status: &ReplayStatus) {
    eprint!(
        "\r  Frame {}/{} | {:?} | calibration {:.0}% | events {}    ",
        status.frame,
        status.total,
        status.phase,
        status.calibration_progress * 100.0,
        status.events,
    );
}

pub async fn run(config: &AppConfig, args: MeasureArgs) -> anyhow::Result<()> {
    let trace = super::load_trace(&args.trace)?;
    let recording_fps = super::resolve_recording_fps(&trace, args.recording_fps)?;
    let recording_start_ns = trace
        .header
        .as_ref()
        .map(|h| h.recording_start_ns)
        .unwrap_or(trace.samples[0].timestamp_ns);

    let expected = args
        .expected
        .as_deref()
        .map(parse_speed_list)
        .transpose()?
        .unwrap_or_default();

    let detector_config = detector_config(config, &args);
    let detector = LiveEventDetector::new(detector_config)?;

    println!("Measuring trace: {}", args.trace.display());
    println!("  Samples: {}", trace.samples.len());
    println!("  Recording FPS: {recording_fps}");
    match detector_config.policy {
        CalibrationPolicy::PeakLearning => println!(
            "  Calibration: {} baseline frames + one calibration actuation",
            detector_config.calibration_frame_count
        ),
        CalibrationPolicy::FixedMargin { margin_factor } => println!(
            "  Calibration: {} baseline frames, threshold = baseline x {margin_factor}",
            detector_config.calibration_frame_count
        ),
    }
    println!();

    let status = LatestValue::new();
    let done = Arc::new(AtomicBool::new(false));

    let reporter = {
        let status = status.clone();
        let done = done.clone();
        tokio::spawn(async move {
            loop {
                let finished = done.load(Ordering::SeqCst);
                if let Some(s) = status.take() {
                    print_status(&s);
                }
                if finished {
                    break;
                }
                tokio::time::sleep(REPORTER_POLL).await;
            }
            eprintln!();
        })
    };

    let timeline: Vec<TimelinePoint> = if args.timeline.is_some() {
        let timebase = FrameTimebase::new(recording_start_ns, recording_fps);
        trace
            .samples
            .iter()
            .map(|s| TimelinePoint {
                frame: timebase.frame_at(s.timestamp_ns),
                timestamp_ns: s.timestamp_ns,
                brightness: s.brightness,
            })
            .collect()
    } else {
        Vec::new()
    };

    let samples = trace.samples;
    let worker_status = status.clone();
    let outcome =
        tokio::task::spawn_blocking(move || replay(detector, samples, worker_status)).await;
    done.store(true, Ordering::SeqCst);
    reporter.await?;
    let outcome = outcome?;

    let Some(calibration) = outcome.calibration else {
        println!();
        println!(
            "Calibration did not complete (stopped in {:?}); no events measured.",
            outcome.final_phase
        );
        return Ok(());
    };

    println!();
    println!("Calibration:");
    println!("  Baseline: {:.2}", calibration.baseline);
    println!("  Threshold: {:.2}", calibration.threshold);
    if let Some(peak) = calibration.peak {
        println!("  Peak: {peak:.2}");
    }
    println!();

    let converter = EventConverter::new(recording_start_ns, recording_fps)
        .with_calibration(Some(calibration.baseline), calibration.peak);
    let events = converter.convert_all(&outcome.events);
    println!("Detected {} shutter events", events.len());

    if let Some(ref path) = args.timeline {
        super::write_timeline(path, &timeline, calibration.threshold, &events)?;
    }

    if events.is_empty() {
        return Ok(());
    }

    let matched = if expected.is_empty() {
        Vec::new()
    } else {
        if expected.len() != events.len() {
            tracing::warn!(
                events = events.len(),
                expected = expected.len(),
                "Event count differs from expected speeds; extra entries are ignored"
            );
        }
        match_expected(&events, &expected, recording_fps)
    };

    let shown = if matched.is_empty() { &events } else { &matched };
    println!();
    println!(
        "{}",
        report::results_table(shown, recording_fps, report::use_color())
    );

    if let Some(ref path) = args.markdown {
        let source = args.trace.display().to_string();
        let header = ReportHeader {
            source: &source,
            recording_fps,
            baseline: calibration.baseline,
            threshold: calibration.threshold,
            peak: calibration.peak,
        };
        std::fs::write(path, report::results_markdown(&header, &events, &matched))
            .map_err(|e| anyhow::anyhow!("Failed to write report {}: {e}", path.display()))?;
        println!();
        println!("Report saved to: {}", path.display());
    }

    if args.output.is_some() || args.save {
        let mut session = MeasurementSession::new(
            args.name.clone(),
            RecordingInfo {
                fps: recording_fps,
                start_ns: recording_start_ns,
                source: Some(args.trace.display().to_string()),
            },
            CalibrationRecord {
                baseline: calibration.baseline,
                threshold: calibration.threshold,
                peak: calibration.peak,
            },
        );
        session.extend_events(if matched.is_empty() { events } else { matched });

        let path = match args.output {
            Some(path) => {
                session.save(&path)?;
                path
            }
            None => session.save_in(&config.sessions_dir)?,
        };
        println!("Session saved to: {}", path.display());
    }

    Ok(())
}
