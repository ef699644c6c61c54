//! At-most-one-run mutual exclusion.
//!
//! The scheduler and the HTTP trigger can both start a run. Overlapping runs
//! would list the same unarchived messages and upload them twice, so every
//! run holds a [`RunPermit`] for its whole duration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "run in progress" flag.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the run slot. `None` if a run is already active.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Releases the run slot when dropped, including during unwinding.
#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
