//! Coalesces this process's durable-store writes of `last_heartbeat_at` so
//! a chatty device pinging every few seconds doesn't hit the database on
//! every request. The cache write happens unconditionally; only the D
//! write is gated.

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

pub struct HeartbeatWriteGate {
    last_write: DashMap<i64, AtomicI64>,
    coalesce_seconds: i64,
}

impl HeartbeatWriteGate {
    pub fn new(coalesce_seconds: i64) -> Self {
        Self {
            last_write: DashMap::new(),
            coalesce_seconds,
        }
    }

    /// `true` and reserves the slot if a write is due for `monitor_id`.
    pub fn should_write(&self, monitor_id: i64, now: i64) -> bool {
        let slot = self
            .last_write
            .entry(monitor_id)
            .or_insert_with(|| AtomicI64::new(0));
        let last = slot.load(Ordering::Relaxed);
        if now - last < self.coalesce_seconds {
            return false;
        }
        slot.compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_coalesced_per_monitor() {
        let gate = HeartbeatWriteGate::new(30);
        assert!(gate.should_write(1, 1000));
        assert!(!gate.should_write(1, 1020));
        assert!(gate.should_write(1, 1030));
        // A different monitor is tracked independently.
        assert!(gate.should_write(2, 1020));
    }
}
