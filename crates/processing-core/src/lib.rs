//! ShutterScope Processing Core
//!
//! Turns per-frame brightness into shutter speed measurements:
//! - **Sampler:** Reduce a luma plane to one brightness value
//! - **Detector:** Online calibration and open-shutter event segmentation
//! - **Converter:** Map detector timestamps onto recording frame indices
//! - **Speed:** Speeds, expected-speed matching, and deviation
//! - **Offline:** Whole-trace batch analysis of a finished recording
//!
//! This crate is pure computation with no I/O and no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod converter;
pub mod detector;
pub mod offline;
pub mod sampler;
pub mod speed;

pub use converter::EventConverter;
pub use detector::{
    Calibration, CalibrationPolicy, DetectorConfig, DetectorConfigError, DetectorPhase,
    FrameOutcome, LiveEventDetector,
};
pub use offline::{OfflineAnalyzer, OfflineConfig, OfflineReport, ThresholdMethod};
pub use sampler::{BrightnessSampler, LumaPlane};
