//! Single-slot "latest value" handoff.
//!
//! The frame loop publishes snapshots at frame rate; consumers that run at a
//! slower cadence (progress output, UI) take whatever is newest. Older
//! values are overwritten, never queued, so the producer never waits on a
//! slow reader.

use std::sync::{Arc, Mutex, MutexGuard};

/// Shared slot holding the most recently published value.
#[derive(Debug)]
pub struct LatestValue<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for LatestValue<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for LatestValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestValue<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the slot contents with `value`.
    pub fn publish(&self, value: T) {
        *self.lock() = Some(value);
    }

    /// Take the newest value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    // A panicked publisher leaves a complete value behind, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}
