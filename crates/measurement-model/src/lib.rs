//! ShutterScope Measurement Model
//!
//! Defines the core data contracts for shutter measurements:
//! - **Samples:** Timestamped per-frame brightness and the JSONL trace format
//! - **Events:** Detected open-shutter spans and derived shutter events
//! - **Stats:** Order statistics used for calibration and weighting
//! - **Session:** Persisted record of one measurement run
//!
//! Brightness is the mean luma of a frame in `[0.0, 255.0]`. Timestamps are
//! monotonic nanoseconds from the frame source.

pub mod event;
pub mod sample;
pub mod session;
pub mod stats;

pub use event::*;
pub use sample::*;
pub use session::*;
pub use stats::StatsError;
