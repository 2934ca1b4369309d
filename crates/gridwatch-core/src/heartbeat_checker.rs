//! The heartbeat checker: the ticker that turns cache evidence into
//! ONLINE/OFFLINE transitions for heartbeat monitors. `evaluate_monitor`
//! also backs phase 2 of the active-ping checker, since both converge on
//! the same cache key once evidence has landed.

use std::sync::Arc;
use std::time::Duration;

use gridwatch_protocol::cache::Cache;
use gridwatch_protocol::monitor::MonitorType;
use gridwatch_protocol::now_unix;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::emit::Emitter;
use crate::metrics::CoreMetrics;
use crate::registry::MonitorEntry;
use crate::registry::MonitorRegistry;
use crate::transition::{decide, Action};

/// Evaluate one monitor's transition for this cycle: read its heartbeat
/// evidence from the cache, decide under its lock, and emit only after
/// the lock is released.
pub async fn evaluate_monitor(
    entry: &Arc<MonitorEntry>,
    cache: &Cache,
    emitter: &Emitter,
    threshold_seconds: i64,
    process_start: i64,
    now: i64,
    metrics: &CoreMetrics,
) {
    {
        let state = entry.state.lock().await;
        if !state.is_active {
            return;
        }
    }

    let last_heartbeat = match cache.get_heartbeat(entry.id).await {
        Ok(Some(value)) => value as i64,
        // Missing key: no evidence since the cache was last wiped.
        Ok(None) => i64::MIN / 2,
        Err(e) => {
            warn!(monitor_id = entry.id, error = %e, "cache read failed, skipping cycle");
            CoreMetrics::incr(&metrics.cache_errors);
            return;
        }
    };

    let eval = {
        let mut state = entry.state.lock().await;
        if !state.is_active {
            return;
        }
        let action = decide(
            state.is_online,
            now,
            last_heartbeat,
            state.last_status_change_at,
            threshold_seconds,
            process_start,
        );
        match action {
            Action::Promote { changed_at, .. } => {
                state.is_online = true;
                state.last_status_change_at = changed_at;
            }
            Action::Demote { changed_at, .. } => {
                state.is_online = false;
                state.last_status_change_at = changed_at;
            }
            Action::NoOp => {}
        }
        (action, state.clone())
    };
    let (action, snapshot) = eval;

    match action {
        Action::Promote {
            changed_at,
            duration_sec,
        } => {
            CoreMetrics::incr(&metrics.promotions);
            emitter
                .emit_transition(
                    entry.id,
                    snapshot.channel_id,
                    snapshot.name,
                    snapshot.address,
                    snapshot.notify_address,
                    true,
                    changed_at,
                    duration_sec,
                    snapshot.outage_region,
                    snapshot.outage_group,
                    snapshot.notify_outage,
                )
                .await;
        }
        Action::Demote {
            changed_at,
            duration_sec,
        } => {
            CoreMetrics::incr(&metrics.demotions);
            emitter
                .emit_transition(
                    entry.id,
                    snapshot.channel_id,
                    snapshot.name,
                    snapshot.address,
                    snapshot.notify_address,
                    false,
                    changed_at,
                    duration_sec,
                    snapshot.outage_region,
                    snapshot.outage_group,
                    snapshot.notify_outage,
                )
                .await;
        }
        Action::NoOp => {}
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    registry: Arc<MonitorRegistry>,
    cache: Cache,
    emitter: Arc<Emitter>,
    interval: Duration,
    threshold_seconds: i64,
    process_start: i64,
    metrics: Arc<CoreMetrics>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("heartbeat checker shutting down");
                return;
            }
            _ = ticker.tick() => {}
        }

        let now = now_unix() as i64;
        let mut cycle = JoinSet::new();
        for entry in registry.snapshot() {
            if entry.monitor_type != MonitorType::Heartbeat {
                continue;
            }
            let entry = Arc::clone(&entry);
            let cache = cache.clone();
            let emitter = Arc::clone(&emitter);
            let metrics = Arc::clone(&metrics);
            cycle.spawn(async move {
                evaluate_monitor(
                    &entry,
                    &cache,
                    &emitter,
                    threshold_seconds,
                    process_start,
                    now,
                    &metrics,
                )
                .await;
            });
        }
        while cycle.join_next().await.is_some() {}
        CoreMetrics::incr(&metrics.heartbeat_cycles);
    }
}
