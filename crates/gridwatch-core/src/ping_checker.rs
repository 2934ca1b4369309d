//! The active-ping checker: concurrent ICMP fan-out (phase 1) followed by
//! the same transition evaluation the heartbeat checker uses (phase 2).
//! The two phases are kept separate so a slow or unreachable target in
//! phase 1 can never couple probe latency to detection latency.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use gridwatch_protocol::cache::Cache;
use gridwatch_protocol::db::Db;
use gridwatch_protocol::monitor::MonitorType;
use gridwatch_protocol::now_unix;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::emit::Emitter;
use crate::heartbeat_checker::evaluate_monitor;
use crate::icmp::Pinger;
use crate::metrics::CoreMetrics;
use crate::registry::MonitorRegistry;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[allow(clippy::too_many_arguments)]
pub async fn run(
    registry: Arc<MonitorRegistry>,
    cache: Cache,
    db: Db,
    prober: Arc<dyn Pinger>,
    emitter: Arc<Emitter>,
    interval: Duration,
    threshold_seconds: i64,
    process_start: i64,
    heartbeat_db_coalesce_seconds: i64,
    metrics: Arc<CoreMetrics>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("active-ping checker shutting down");
                return;
            }
            _ = ticker.tick() => {}
        }

        let entries: Vec<_> = registry
            .snapshot()
            .into_iter()
            .filter(|e| e.monitor_type == MonitorType::Ping)
            .collect();

        let mut probes = JoinSet::new();
        for entry in &entries {
            let active = entry.state.lock().await.is_active;
            if !active {
                continue;
            }
            let entry = Arc::clone(entry);
            let cache = cache.clone();
            let db = db.clone();
            let prober = Arc::clone(&prober);
            let metrics = Arc::clone(&metrics);
            probes.spawn(async move {
                let Some(target) = resolve_target(&entry.ping_target).await else {
                    CoreMetrics::incr(&metrics.icmp_failures);
                    return;
                };
                let reachable = tokio::time::timeout(PROBE_TIMEOUT, prober.probe(target))
                    .await
                    .unwrap_or(false);
                if reachable {
                    let now = now_unix();
                    if let Err(e) = cache.set_heartbeat(entry.id, now).await {
                        warn!(monitor_id = entry.id, error = %e, "failed to write ping evidence to cache");
                    }
                    if entry.should_write_heartbeat_to_db(now as i64, heartbeat_db_coalesce_seconds) {
                        if let Err(e) = db.update_last_heartbeat(entry.id, now as i64).await {
                            warn!(monitor_id = entry.id, error = %e, "failed to persist last_heartbeat_at");
                        }
                    }
                } else {
                    CoreMetrics::incr(&metrics.icmp_failures);
                }
            });
        }
        while probes.join_next().await.is_some() {}
        CoreMetrics::incr(&metrics.ping_cycles);

        let now = now_unix() as i64;
        let mut evals = JoinSet::new();
        for entry in entries {
            let cache = cache.clone();
            let emitter = Arc::clone(&emitter);
            let metrics = Arc::clone(&metrics);
            evals.spawn(async move {
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
        while evals.join_next().await.is_some() {}
    }
}

async fn resolve_target(target: &str) -> Option<IpAddr> {
    if let Ok(ip) = IpAddr::from_str(target) {
        return Some(ip);
    }
    tokio::net::lookup_host((target, 0))
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.ip())
}

#[cfg(test)]
mod tests {
    //! Fan-out bound: one cycle completes in roughly one probe timeout, not
    //! N of them, regardless of how many targets are unreachable. Runs
    //! against a fake `Pinger` under a paused clock so the simulated
    //! elapsed time is exact and the test has no real-world flakiness.

    use std::net::Ipv4Addr;

    use async_trait::async_trait;
    use tokio::task::JoinSet;

    use super::*;
    use crate::icmp::Pinger;

    struct FakePinger {
        delay: Duration,
        reachable: bool,
    }

    #[async_trait]
    impl Pinger for FakePinger {
        async fn probe(&self, _target: IpAddr) -> bool {
            tokio::time::sleep(self.delay).await;
            self.reachable
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_completes_in_bounded_time_regardless_of_monitor_count() {
        let reachable: Arc<dyn Pinger> = Arc::new(FakePinger {
            delay: Duration::from_millis(50),
            reachable: true,
        });
        let unreachable: Arc<dyn Pinger> = Arc::new(FakePinger {
            delay: PROBE_TIMEOUT,
            reachable: false,
        });

        let start = tokio::time::Instant::now();
        let mut probes = JoinSet::new();
        for i in 0..200 {
            let prober = if i < 150 {
                Arc::clone(&reachable)
            } else {
                Arc::clone(&unreachable)
            };
            probes.spawn(async move {
                tokio::time::timeout(PROBE_TIMEOUT, prober.probe(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))))
                    .await
                    .unwrap_or(false)
            });
        }

        let mut reachable_count = 0;
        while let Some(result) = probes.join_next().await {
            if result.expect("probe task panicked") {
                reachable_count += 1;
            }
        }
        let elapsed = start.elapsed();

        assert_eq!(reachable_count, 150);
        // All 200 probes ran concurrently: elapsed tracks the single
        // slowest probe (the timeout), not the sum across 200 of them.
        assert!(elapsed <= PROBE_TIMEOUT + Duration::from_secs(1));
    }
}
