//! Reconciles the in-memory registry against the durable store on a fixed
//! interval, since an external settings surface writes monitor config
//! directly to the database rather than through this process. Never
//! touches `is_online` or `last_status_change_at` — those stay
//! Liveness-Core-authored.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use gridwatch_protocol::db::Db;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::metrics::CoreMetrics;
use crate::registry::MonitorRegistry;

pub async fn run(
    db: Db,
    registry: Arc<MonitorRegistry>,
    interval: Duration,
    metrics: Arc<CoreMetrics>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("config sync shutting down");
                return;
            }
            _ = ticker.tick() => {}
        }

        let configs = match db.list_configs().await {
            Ok(configs) => configs,
            Err(e) => {
                error!(error = %e, "config sync: failed to list monitor configs");
                continue;
            }
        };

        for config in &configs {
            if !registry.contains_id(config.id) {
                match db.get(config.id).await {
                    Ok(Some(monitor)) => registry.insert(&monitor),
                    Ok(None) => continue,
                    Err(e) => {
                        error!(monitor_id = config.id, error = %e, "config sync: failed to load new monitor");
                        continue;
                    }
                }
            }
            registry.apply_config(config).await;
        }

        let current_ids: HashSet<i64> = configs.iter().map(|c| c.id).collect();
        for id in registry.all_ids() {
            if !current_ids.contains(&id) {
                registry.remove_by_id(id);
            }
        }

        CoreMetrics::incr(&metrics.config_sync_cycles);
    }
}
