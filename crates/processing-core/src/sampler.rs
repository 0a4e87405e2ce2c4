//! Frame brightness sampling.
//!
//! Reduces a luma (Y) plane to the mean of an evenly spaced subsample. With
//! stride `S` only every `S`-th pixel of every `S`-th row is read, so the
//! cost is roughly `1/S²` of a full scan. The result is always a value in
//! `[0.0, 255.0]`; malformed planes yield `0.0` instead of an error so the
//! detector downstream only ever sees well-formed input.

/// Borrowed view of an 8-bit luma plane.
#[derive(Debug, Clone, Copy)]
pub struct LumaPlane<'a> {
    pub width: usize,
    pub height: usize,
    /// Bytes between the starts of consecutive rows.
    pub row_stride: usize,
    /// Bytes between horizontally adjacent pixels.
    pub pixel_stride: usize,
    pub data: &'a [u8],
}

impl<'a> LumaPlane<'a> {
    /// Tightly packed GRAY8 plane (`row_stride == width`, `pixel_stride == 1`).
    pub fn packed(width: usize, height: usize, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            row_stride: width,
            pixel_stride: 1,
            data,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.width == 0
            || self.height == 0
            || self.row_stride == 0
            || self.pixel_stride == 0
            || self.data.is_empty()
    }
}

/// Brightness sampler configuration and entry point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessSampler {
    stride: usize,
    central_fraction: f64,
}

impl Default for BrightnessSampler {
    fn default() -> Self {
        Self {
            stride: 4,
            central_fraction: 1.0,
        }
    }
}

impl BrightnessSampler {
    /// Sample every `stride`-th pixel over the whole frame.
    pub fn new(stride: usize) -> Self {
        Self {
            stride,
            central_fraction: 1.0,
        }
    }

    /// Restrict sampling to a centered region covering `fraction` of each
    /// dimension. Values outside `(0.0, 1.0]` are clamped into it.
    pub fn with_central_fraction(mut self, fraction: f64) -> Self {
        self.central_fraction = if fraction.is_finite() && fraction > 0.0 {
            fraction.min(1.0)
        } else {
            1.0
        };
        self
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn central_fraction(&self) -> f64 {
        self.central_fraction
    }

    /// Mean luma of the sampled pixels, or `0.0` for degenerate input.
    pub fn sample(&self, plane: &LumaPlane<'_>) -> f64 {
        if self.stride == 0 || plane.is_degenerate() {
            return 0.0;
        }

        let (x0, x1) = central_span(plane.width, self.central_fraction);
        let (y0, y1) = central_span(plane.height, self.central_fraction);

        let mut sum: u64 = 0;
        let mut count: u64 = 0;
        for y in (y0..y1).step_by(self.stride) {
            let Some(row_start) = y.checked_mul(plane.row_stride) else {
                continue;
            };
            for x in (x0..x1).step_by(self.stride) {
                let offset = x
                    .checked_mul(plane.pixel_stride)
                    .and_then(|dx| row_start.checked_add(dx));
                // Short buffers are tolerated; out-of-range pixels are skipped.
                if let Some(&luma) = offset.and_then(|o| plane.data.get(o)) {
                    sum += luma as u64;
                    count += 1;
                }
            }
        }

        if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        }
    }
}

/// Half-open index range of the centered `fraction` of `len`, never empty
/// for `len > 0`.
fn central_span(len: usize, fraction: f64) -> (usize, usize) {
    let span = ((len as f64 * fraction).round() as usize).clamp(1, len);
    let start = (len - span) / 2;
    (start, start + span)
}
