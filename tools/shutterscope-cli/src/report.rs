//! Terminal and markdown rendering of measurement results.

use std::fmt::Write as _;
use std::io::IsTerminal;

use shutterscope_measurement_model::ShutterEvent;
use shutterscope_processing_core::speed;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Deviation beyond which a color step is taken: green, yellow, orange, red.
const VARIATION_STEPS: [f64; 3] = [5.0, 10.0, 15.0];

/// Deviation at which the markdown gradient saturates to red.
const VARIATION_CAP: f64 = 25.0;

/// Whether stdout should receive ANSI colors.
pub fn use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

/// ANSI color for a deviation percentage.
pub fn variation_color(variation_percent: f64) -> &'static str {
    let v = variation_percent.abs();
    if v < VARIATION_STEPS[0] {
        "\x1b[92m"
    } else if v < VARIATION_STEPS[1] {
        "\x1b[93m"
    } else if v < VARIATION_STEPS[2] {
        "\x1b[33m"
    } else {
        "\x1b[91m"
    }
}

/// Green → yellow → red gradient for a deviation percentage.
pub fn variation_to_rgb(variation_percent: f64) -> (u8, u8, u8) {
    let ratio = variation_percent.abs().min(VARIATION_CAP) / VARIATION_CAP;
    if ratio < 0.5 {
        ((255.0 * ratio * 2.0) as u8, 255, 0)
    } else {
        (255, (255.0 * (1.0 - (ratio - 0.5) * 2.0)) as u8, 0)
    }
}

pub fn rgb_to_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn measured_of(event: &ShutterEvent, recording_fps: f64) -> f64 {
    event
        .measured_speed
        .unwrap_or_else(|| speed::measured_speed(event, recording_fps, true))
}

fn speed_label(denominator: f64) -> String {
    if denominator > 0.0 {
        speed::format_speed(1.0 / denominator)
    } else {
        speed::format_speed(0.0)
    }
}

fn signed_percent(variation: f64) -> String {
    let sign = if variation > 0.0 { "+" } else { "" };
    format!("{sign}{variation:.1}%")
}

/// Fixed-width results table.
///
/// Expected and variation columns are added when any event carries an
/// expected speed.
pub fn results_table(events: &[ShutterEvent], recording_fps: f64, color: bool) -> String {
    let (bold, reset) = if color { (BOLD, RESET) } else { ("", "") };
    let compare = events.iter().any(|e| e.expected_speed.is_some());
    let mut out = String::new();

    if compare {
        let _ = writeln!(
            out,
            "{bold}{:<7} {:<8} {:<10} {:<12} {:<12} {:<12}{reset}",
            "Event", "Frames", "Weighted", "Measured", "Expected", "Variation"
        );
        let _ = writeln!(out, "{}", "-".repeat(65));
    } else {
        let _ = writeln!(
            out,
            "{bold}{:<7} {:<8} {:<10} {:<12}{reset}",
            "Event", "Frames", "Weighted", "Measured"
        );
        let _ = writeln!(out, "{}", "-".repeat(40));
    }

    for (i, event) in events.iter().enumerate() {
        let measured = speed_label(measured_of(event, recording_fps));
        let _ = write!(
            out,
            "{:<7} {:<8} {:<10.2} {:<12}",
            i + 1,
            event.duration_frames(),
            event.weighted_duration_frames(),
            measured
        );
        if compare {
            let expected = event.expected_speed.map(speed_label).unwrap_or_default();
            let _ = write!(out, " {expected:<12}");
            if let Some(variation) = event.deviation_percent() {
                let (on, off) = if color {
                    (variation_color(variation), RESET)
                } else {
                    ("", "")
                };
                let _ = write!(out, " {on}{}{off}", signed_percent(variation));
            }
        }
        out.push('\n');
    }

    out.truncate(out.trim_end().len());
    out
}

/// Context printed at the top of a markdown report.
pub struct ReportHeader<'a> {
    pub source: &'a str,
    pub recording_fps: f64,
    pub baseline: f64,
    pub threshold: f64,
    pub peak: Option<f64>,
}

/// Markdown report: every detected event, then the comparison for events
/// matched to an expected speed.
pub fn results_markdown(
    header: &ReportHeader<'_>,
    events: &[ShutterEvent],
    matched: &[ShutterEvent],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Shutter Speed Analysis Results\n");
    let _ = writeln!(out, "**Source:** {}", header.source);
    let _ = writeln!(out, "**Date:** {}", chrono::Local::now().format("%Y-%m-%d"));
    let _ = writeln!(out, "**Recording FPS:** {}", header.recording_fps);
    let _ = writeln!(out, "**Baseline:** {:.2}", header.baseline);
    let _ = writeln!(out, "**Threshold:** {:.2}", header.threshold);
    if let Some(peak) = header.peak {
        let _ = writeln!(out, "**Peak:** {peak:.2}");
    }

    let _ = writeln!(out, "\n## Detected Events\n");
    let _ = writeln!(
        out,
        "| Event | Start Frame | End Frame | Duration | Weighted | Measured Speed |"
    );
    let _ = writeln!(
        out,
        "|-------|-------------|-----------|----------|----------|----------------|"
    );
    for (i, event) in events.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {:.2} | {} |",
            i + 1,
            event.start_frame,
            event.end_frame,
            event.duration_frames(),
            event.weighted_duration_frames(),
            speed_label(measured_of(event, header.recording_fps))
        );
    }

    if !matched.is_empty() {
        let _ = writeln!(out, "\n## Comparison with Expected\n");
        let _ = writeln!(out, "| Event | Expected | Measured | Variation |");
        let _ = writeln!(out, "|-------|----------|----------|-----------|");
        for (i, event) in matched.iter().enumerate() {
            let expected = event.expected_speed.map(speed_label).unwrap_or_default();
            let measured = speed_label(measured_of(event, header.recording_fps));
            let variation = match event.deviation_percent() {
                Some(v) => format!(
                    "<span style=\"color: {}\">{}</span>",
                    rgb_to_hex(variation_to_rgb(v)),
                    signed_percent(v)
                ),
                None => String::new(),
            };
            let _ = writeln!(out, "| {} | {expected} | {measured} | {variation} |", i + 1);
        }
    }

    out
}

/// One trace sample placed on the recording's frame grid.
#[derive(Debug, Clone, Copy)]
pub struct TimelinePoint {
    pub frame: u64,
    pub timestamp_ns: i64,
    pub brightness: f64,
}

/// Brightness timeline as CSV, one row per sample.
///
/// `event` holds the 1-based number of the event whose span contains the
/// frame and is empty between events.
pub fn timeline_csv(points: &[TimelinePoint], threshold: f64, events: &[ShutterEvent]) -> String {
    let mut out = String::from("frame,timestamp_ns,brightness,threshold,event\n");
    for point in points {
        let event = events
            .iter()
            .position(|e| (e.start_frame..=e.end_frame).contains(&point.frame))
            .map(|i| (i + 1).to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{:.3},{:.3},{}",
            point.frame, point.timestamp_ns, point.brightness, threshold, event
        );
    }
    out
}
