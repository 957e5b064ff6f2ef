//! Lock-free frame-ready signal between the capture thread and the render loop.
//!
//! The capture callback increments a counter on every frame-available
//! notification; the render loop drains it to zero once per tick. Bursts of
//! notifications therefore collapse into a single update pass: the bridge is
//! a latest-value pipe, never a queue.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Coalescing frame-ready counter.
///
/// `signal` may be called from any number of threads. `drain` assumes a
/// single consumer; concurrent drains are a caller error.
#[derive(Debug, Default)]
pub struct FrameReadySignal {
    pending: AtomicU32,
    /// Lifetime count of notifications, for diagnostics only.
    total: AtomicU64,
}

impl FrameReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one new frame. Never blocks, never fails.
    pub fn signal(&self) {
        let mut current = self.pending.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_add(1);
            match self.pending.compare_exchange_weak(
                current,
                next,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Drain all pending notifications. Returns `false` if there were none.
    pub fn drain(&self) -> bool {
        self.drain_count() > 0
    }

    /// Drain all pending notifications, returning how many were coalesced.
    ///
    /// Decrements one at a time until the counter reads zero. A producer
    /// racing with the drain only extends the loop; the counter is zero
    /// when this returns unless a signal landed after the final decrement.
    pub fn drain_count(&self) -> u32 {
        let mut current = self.pending.load(Ordering::Acquire);
        let mut drained = 0;
        while current > 0 {
            match self.pending.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    drained += 1;
                    current -= 1;
                }
                Err(actual) => current = actual,
            }
        }
        drained
    }

    /// Notifications not yet drained.
    pub fn pending(&self) -> u32 {
        self.pending.load(Ordering::Acquire)
    }

    /// Notifications received over the signal's lifetime.
    pub fn total_signaled(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}
