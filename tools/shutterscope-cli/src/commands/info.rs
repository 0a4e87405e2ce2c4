//! Show a saved measurement session.

use std::path::PathBuf;

use shutterscope_measurement_model::MeasurementSession;

use crate::report;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let session = MeasurementSession::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load session: {e}"))?;

    println!("Session: {}", session.name);
    println!("  ID: {}", session.id);
    println!("  Created: {}", session.created_at);
    println!();

    println!("Recording:");
    println!("  FPS: {}", session.recording.fps);
    println!("  Start: {} ns", session.recording.start_ns);
    if let Some(ref source) = session.recording.source {
        println!("  Source: {source}");
    }
    println!();

    println!("Calibration:");
    println!("  Baseline: {:.2}", session.calibration.baseline);
    println!("  Threshold: {:.2}", session.calibration.threshold);
    match session.calibration.peak {
        Some(peak) => println!("  Peak: {peak:.2}"),
        None => println!("  Peak: (fixed margin)"),
    }
    println!();

    println!("Events: {}", session.events.len());
    if !session.events.is_empty() {
        let events = session.shutter_events();
        println!();
        println!(
            "{}",
            report::results_table(&events, session.recording.fps, report::use_color())
        );
    }
    if let Some(deviation) = session.mean_abs_deviation() {
        println!();
        println!("Mean absolute deviation: {deviation:.1}%");
    }

    Ok(())
}
