//! Delivery: consumes `status.change`, `graph.ready`, and `outage.photo`
//! from the bus, one worker task per queue, and renders/sends/edits the
//! corresponding chat messages.

mod chat_client;
mod config;
mod consumer;
mod render;

use std::sync::Arc;

use gridwatch_protocol::bus::Bus;
use gridwatch_protocol::db::Db;
use gridwatch_schedule::client::HttpScheduleClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chat_client::{ChatClient, HttpChatClient};
use crate::config::DeliveryConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "delivery exited with error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = DeliveryConfig::from_env()?;

    info!("connecting to infrastructure");
    let db = Db::connect(&config.database_url, false).await?;
    let bus = Bus::connect(&config.rabbitmq_url).await?;
    bus.declare_topology().await?;
    info!("connected to database and bus");

    let chat: Arc<dyn ChatClient> = Arc::new(HttpChatClient::new(
        config.chat_api_base_url,
        config.chat_api_token,
    )?);
    let schedule = Arc::new(HttpScheduleClient::new(config.schedule_api_base_url)?);

    let cancel = CancellationToken::new();

    let status_change_task = tokio::spawn(consumer::status_change::run(
        bus.clone(),
        db.clone(),
        Arc::clone(&chat),
        schedule,
        cancel.clone(),
    ));
    let graph_ready_task = tokio::spawn(consumer::graph_ready::run(
        bus.clone(),
        db.clone(),
        Arc::clone(&chat),
        cancel.clone(),
    ));
    let outage_photo_task = tokio::spawn(consumer::outage_photo::run(
        bus.clone(),
        db.clone(),
        Arc::clone(&chat),
        cancel.clone(),
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }
    cancel.cancel();

    for (name, handle) in [
        ("status.change consumer", status_change_task),
        ("graph.ready consumer", graph_ready_task),
        ("outage.photo consumer", outage_photo_task),
    ] {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(task = name, error = %e, "consumer task returned an error"),
            Err(e) => warn!(task = name, error = %e, "consumer task ended with a join error"),
        }
    }

    info!("delivery shut down cleanly");
    Ok(())
}
