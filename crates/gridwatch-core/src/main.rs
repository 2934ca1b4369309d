//! Liveness Core: owns the authoritative in-memory monitor registry, runs
//! the heartbeat and active-ping checkers, detects transitions, and emits
//! them to the bus.

mod config;
mod config_sync;
mod emit;
mod heartbeat_checker;
mod icmp;
mod metrics;
mod ping_checker;
mod registry;
mod transition;

use std::sync::Arc;
use std::time::Duration;

use gridwatch_protocol::bus::Bus;
use gridwatch_protocol::cache::Cache;
use gridwatch_protocol::db::Db;
use gridwatch_protocol::now_unix;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::CoreConfig;
use crate::emit::Emitter;
use crate::icmp::IcmpProber;
use crate::metrics::CoreMetrics;
use crate::registry::MonitorRegistry;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);
const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "liveness core exited with error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = CoreConfig::from_env()?;
    let process_start = now_unix() as i64;

    info!("connecting to infrastructure");
    let db = Db::connect(&config.database_url, true).await?;
    let cache = Cache::connect(&config.redis_url).await?;
    let bus = Bus::connect(&config.rabbitmq_url).await?;
    bus.declare_topology().await?;
    info!("connected to database, cache, and bus");

    let monitors = db.list_all().await?;
    let registry = Arc::new(MonitorRegistry::load(&monitors));
    info!(count = registry.len(), "loaded monitor registry");

    let prober: Arc<dyn icmp::Pinger> = Arc::new(IcmpProber::new(config.ping_privileged)?);
    let emitter = Arc::new(Emitter::new(db.clone(), bus.clone()));
    let metrics = Arc::new(CoreMetrics::new());

    let cancel = CancellationToken::new();

    let heartbeat_task = tokio::spawn(heartbeat_checker::run(
        Arc::clone(&registry),
        cache.clone(),
        Arc::clone(&emitter),
        config.heartbeat_check_interval,
        config.offline_threshold_seconds,
        process_start,
        Arc::clone(&metrics),
        cancel.clone(),
    ));

    let ping_task = tokio::spawn(ping_checker::run(
        Arc::clone(&registry),
        cache.clone(),
        db.clone(),
        Arc::clone(&prober),
        Arc::clone(&emitter),
        config.ping_check_interval,
        config.offline_threshold_seconds,
        process_start,
        config.heartbeat_db_coalesce_seconds,
        Arc::clone(&metrics),
        cancel.clone(),
    ));

    let config_sync_task = tokio::spawn(config_sync::run(
        db.clone(),
        Arc::clone(&registry),
        config.config_sync_interval,
        Arc::clone(&metrics),
        cancel.clone(),
    ));

    let metrics_task = tokio::spawn(log_metrics(Arc::clone(&metrics), cancel.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }
    cancel.cancel();

    for (name, handle) in [
        ("heartbeat checker", heartbeat_task),
        ("active-ping checker", ping_task),
        ("config sync", config_sync_task),
        ("metrics logger", metrics_task),
    ] {
        if let Err(e) = handle.await {
            warn!(task = name, error = %e, "task ended with a join error");
        }
    }

    emitter.shutdown(SHUTDOWN_GRACE).await;
    info!("liveness core shut down cleanly");
    Ok(())
}

async fn log_metrics(metrics: Arc<CoreMetrics>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(METRICS_LOG_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let snapshot = metrics.snapshot();
        info!(
            heartbeat_cycles = snapshot.heartbeat_cycles,
            ping_cycles = snapshot.ping_cycles,
            promotions = snapshot.promotions,
            demotions = snapshot.demotions,
            cache_errors = snapshot.cache_errors,
            icmp_failures = snapshot.icmp_failures,
            config_sync_cycles = snapshot.config_sync_cycles,
            "liveness core metrics"
        );
    }
}
