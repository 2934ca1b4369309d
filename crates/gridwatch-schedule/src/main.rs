//! Schedule Enrichment: the hourly outage-photo refresh process. The
//! schedule-lookup client and contradiction logic in this crate's library
//! half are also linked into Delivery for message annotation.

mod config;
mod photo_refresh;

use gridwatch_protocol::bus::Bus;
use gridwatch_protocol::db::Db;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ScheduleConfig;
use crate::photo_refresh::PhotoFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "schedule enrichment exited with error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = ScheduleConfig::from_env()?;

    info!("connecting to infrastructure");
    let db = Db::connect(&config.database_url, false).await?;
    let bus = Bus::connect(&config.rabbitmq_url).await?;
    bus.declare_topology().await?;
    info!("connected to database and bus");

    let fetcher = PhotoFetcher::new(config.schedule_api_base_url.clone())?;
    let cancel = CancellationToken::new();

    let refresh_task = tokio::spawn(photo_refresh::run(
        db.clone(),
        bus.clone(),
        fetcher,
        config.photo_refresh_interval,
        cancel.clone(),
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }
    cancel.cancel();

    if let Err(e) = refresh_task.await {
        warn!(task = "photo refresh", error = %e, "task ended with a join error");
    }

    info!("schedule enrichment shut down cleanly");
    Ok(())
}
