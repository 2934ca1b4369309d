//! Ingest: validates ping tokens, writes heartbeat evidence to the cache,
//! and serves the public map read path.

mod config;
mod heartbeat_gate;
mod map_cache;
mod routes;
mod state;

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use gridwatch_protocol::cache::Cache;
use gridwatch_protocol::db::Db;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::IngestConfig;
use crate::routes::{map::handle_map, ping::handle_ping};
use crate::state::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = IngestConfig::from_env()?;

    info!("connecting to infrastructure");
    let db = Db::connect(&config.database_url, false).await?;
    let cache = Cache::connect(&config.redis_url).await?;
    info!("connected to database and cache");

    let state = AppState::new(
        db,
        cache,
        Duration::from_secs(config.map_cache_ttl_seconds),
        config.heartbeat_db_coalesce_seconds,
    );

    let app = Router::new()
        .route("/api/ping/:token", get(handle_ping).post(handle_ping))
        .route("/api/map", get(handle_map))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(tower::timeout::TimeoutLayer::new(REQUEST_TIMEOUT)),
        )
        .with_state(state);

    let cancel = CancellationToken::new();
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "ingest listening");

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel.cancel();
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("ingest shut down cleanly");
    Ok(())
}
