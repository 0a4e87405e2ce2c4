//! Reduce a raw GRAY8 frame dump to a brightness trace.

use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::PathBuf;

use shutterscope_common::{AppConfig, FrameTimebase};
use shutterscope_measurement_model::{serialize_trace, BrightnessSample, TraceHeader};
use shutterscope_processing_core::{BrightnessSampler, LumaPlane};

/// Geometry and timing of the frames in a dump.
pub struct FrameLayout {
    pub width: usize,
    pub height: usize,
    pub fps: f64,
    pub start_ns: i64,
}

pub fn run(
    config: &AppConfig,
    frames: PathBuf,
    layout: FrameLayout,
    stride: Option<usize>,
    central_fraction: Option<f64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if layout.width == 0 || layout.height == 0 {
        anyhow::bail!("Frame size must be non-zero, got {}x{}", layout.width, layout.height);
    }
    if !(layout.fps.is_finite() && layout.fps > 0.0) {
        anyhow::bail!("--fps must be positive, got {}", layout.fps);
    }

    let stride = stride.unwrap_or(config.sampler.stride);
    if stride == 0 {
        anyhow::bail!("--stride must be at least 1");
    }
    let sampler = BrightnessSampler::new(stride)
        .with_central_fraction(central_fraction.unwrap_or(config.sampler.central_fraction));

    let file = std::fs::File::open(&frames)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", frames.display()))?;

    let frame_len = layout
        .width
        .checked_mul(layout.height)
        .ok_or_else(|| anyhow::anyhow!("Frame size overflows"))?;
    let (samples, leftover) = sample_frames(BufReader::new(file), &layout, frame_len, &sampler)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", frames.display()))?;
    if leftover > 0 {
        tracing::warn!(
            leftover_bytes = leftover,
            frame_bytes = frame_len,
            "Ignoring trailing partial frame"
        );
    }

    tracing::info!(
        frames = samples.len(),
        stride = sampler.stride(),
        central_fraction = sampler.central_fraction(),
        "Sampled frame dump"
    );

    let mut header = TraceHeader::new(layout.fps, layout.start_ns);
    header.frame_width = u32::try_from(layout.width).unwrap_or(u32::MAX);
    header.frame_height = u32::try_from(layout.height).unwrap_or(u32::MAX);
    header.sampling_stride = sampler.stride();

    let jsonl = serialize_trace(&header, &samples)?;
    match output {
        Some(path) => {
            std::fs::write(&path, jsonl)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
            eprintln!("Wrote {} samples to {}", samples.len(), path.display());
        }
        None => {
            std::io::stdout().lock().write_all(jsonl.as_bytes())?;
        }
    }

    Ok(())
}

/// Sample every complete `frame_len`-byte frame from `reader`.
///
/// Returns the samples and the byte count of a trailing partial frame.
fn sample_frames(
    mut reader: impl Read,
    layout: &FrameLayout,
    frame_len: usize,
    sampler: &BrightnessSampler,
) -> std::io::Result<(Vec<BrightnessSample>, usize)> {
    let timebase = FrameTimebase::new(layout.start_ns, layout.fps);
    let mut buffer = vec![0u8; frame_len];
    let mut samples = Vec::new();

    loop {
        let filled = fill_frame(&mut reader, &mut buffer)?;
        if filled < frame_len {
            return Ok((samples, filled));
        }
        let plane = LumaPlane::packed(layout.width, layout.height, &buffer);
        let frame = samples.len() as u64;
        samples.push(BrightnessSample::new(
            timebase.timestamp_of(frame),
            sampler.sample(&plane),
        ));
    }
}

/// Read until `buffer` is full or the input ends, returning the bytes read.
fn fill_frame(reader: &mut impl Read, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
