//! Concurrency tracking for mocks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts concurrent callers and remembers the peak.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one caller as inside; it leaves when the guard drops.
    pub fn enter(&self) -> ProbeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ProbeGuard {
            current: Arc::clone(&self.current),
        }
    }

    /// Callers inside right now.
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous callers seen.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Leaves the probe on drop.
#[derive(Debug)]
pub struct ProbeGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}
