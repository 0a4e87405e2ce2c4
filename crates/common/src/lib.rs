//! ShutterScope Common Utilities
//!
//! Shared infrastructure for all ShutterScope crates:
//! - Error types and result aliases
//! - Frame timebase and rate utilities for timestamp/frame conversion
//! - Single-slot handoff between the frame loop and slower consumers
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod handoff;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use handoff::LatestValue;
