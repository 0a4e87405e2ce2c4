pub mod info;
pub mod measure;
pub mod sample;
pub mod scan;

use std::path::Path;

use shutterscope_measurement_model::{parse_trace, BrightnessTrace, ShutterEvent};

use crate::report::{self, TimelinePoint};

/// Read and parse a trace file.
pub fn load_trace(path: &Path) -> anyhow::Result<BrightnessTrace> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read trace {}: {e}", path.display()))?;
    let trace = parse_trace(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse trace {}: {e}", path.display()))?;
    if trace.samples.is_empty() {
        anyhow::bail!("Trace {} contains no samples", path.display());
    }
    if !trace.is_monotonic() {
        tracing::warn!(path = %path.display(), "Trace timestamps are not strictly increasing");
    }
    Ok(trace)
}

/// Recording fps from the command line, else from the trace header.
pub fn resolve_recording_fps(
    trace: &BrightnessTrace,
    recording_fps: Option<f64>,
) -> anyhow::Result<f64> {
    let fps = recording_fps
        .or_else(|| trace.header.as_ref().map(|h| h.recording_fps))
        .ok_or_else(|| {
            anyhow::anyhow!("Trace has no header; pass --recording-fps to set the capture rate")
        })?;
    if !(fps.is_finite() && fps > 0.0) {
        anyhow::bail!("Recording fps must be positive, got {fps}");
    }
    Ok(fps)
}

/// Write the brightness timeline CSV to `path`.
pub fn write_timeline(
    path: &Path,
    points: &[TimelinePoint],
    threshold: f64,
    events: &[ShutterEvent],
) -> anyhow::Result<()> {
    std::fs::write(path, report::timeline_csv(points, threshold, events))
        .map_err(|e| anyhow::anyhow!("Failed to write timeline {}: {e}", path.display()))?;
    eprintln!("Timeline saved to: {}", path.display());
    Ok(())
}
