//! Lightweight in-process counters, logged periodically rather than
//! exported — there is no metrics scrape endpoint in this fleet, so a
//! ticker in `main` logs a snapshot at `info` level instead.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct CoreMetrics {
    pub heartbeat_cycles: AtomicU64,
    pub ping_cycles: AtomicU64,
    pub promotions: AtomicU64,
    pub demotions: AtomicU64,
    pub cache_errors: AtomicU64,
    pub icmp_failures: AtomicU64,
    pub config_sync_cycles: AtomicU64,
}

impl CoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CoreMetricsSnapshot {
        CoreMetricsSnapshot {
            heartbeat_cycles: self.heartbeat_cycles.load(Ordering::Relaxed),
            ping_cycles: self.ping_cycles.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
            icmp_failures: self.icmp_failures.load(Ordering::Relaxed),
            config_sync_cycles: self.config_sync_cycles.load(Ordering::Relaxed),
        }
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CoreMetricsSnapshot {
    pub heartbeat_cycles: u64,
    pub ping_cycles: u64,
    pub promotions: u64,
    pub demotions: u64,
    pub cache_errors: u64,
    pub icmp_failures: u64,
    pub config_sync_cycles: u64,
}
