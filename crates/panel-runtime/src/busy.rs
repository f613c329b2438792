//! The single global busy indicator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared `loading` flag guarding interactive controls.
///
/// This is an indicator, not a lock: a second action may start while the
/// first is still running, and whichever finishes first clears the flag.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise the flag until the returned guard drops.
    pub fn hold(&self) -> BusyGuard {
        self.0.store(true, Ordering::SeqCst);
        BusyGuard(self.0.clone())
    }
}

/// Clears the [`BusyFlag`] when dropped.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
