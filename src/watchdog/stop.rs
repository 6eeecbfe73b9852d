//! Cooperative stop signal.
//!
//! Requesting a stop does not interrupt anything. The loop checks the flag
//! at the top of each tick and the sequencer checks it between attempts, so
//! a stop issued mid-restart can take up to one full attempt to land.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the watchdog to stop at its next safe point.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
