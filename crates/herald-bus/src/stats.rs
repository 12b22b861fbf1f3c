//! Delivery statistics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the bus as it works.
#[derive(Debug, Default)]
pub struct BusStats {
    /// Publish calls (including offline replays)
    pub published: AtomicU64,
    /// Handler invocations started
    pub delivered: AtomicU64,
    /// Handler invocations that failed or panicked
    pub handler_failures: AtomicU64,
    /// Messages placed in the offline queue
    pub queued: AtomicU64,
    /// Queued messages evicted by the bound
    pub evicted: AtomicU64,
    /// Requests issued
    pub requests_issued: AtomicU64,
    /// Requests answered before their timeout
    pub requests_responded: AtomicU64,
    /// Requests that timed out
    pub requests_timed_out: AtomicU64,
}

/// Point-in-time copy of [`BusStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub published: u64,
    pub delivered: u64,
    pub handler_failures: u64,
    pub queued: u64,
    pub evicted: u64,
    pub requests_issued: u64,
    pub requests_responded: u64,
    pub requests_timed_out: u64,
}

impl BusStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            requests_issued: self.requests_issued.load(Ordering::Relaxed),
            requests_responded: self.requests_responded.load(Ordering::Relaxed),
            requests_timed_out: self.requests_timed_out.load(Ordering::Relaxed),
        }
    }
}
