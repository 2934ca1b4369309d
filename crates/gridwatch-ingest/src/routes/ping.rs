//! `GET|POST /api/ping/:token` — the heartbeat path. Only writes the cache
//! synchronously; the durable-store refresh is fire-and-forget so this
//! handler's latency never depends on database latency.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use gridwatch_protocol::now_unix;
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

pub async fn handle_ping(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let monitor = state
        .db
        .find_by_token(&token)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if !monitor.is_active {
        return Ok(Json(json!({ "status": "paused" })));
    }

    let now = now_unix();
    if let Err(e) = state.cache.set_heartbeat(monitor.id, now).await {
        warn!(monitor_id = monitor.id, error = %e, "failed to write heartbeat to cache");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    if state.heartbeat_gate.should_write(monitor.id, now as i64) {
        let db = state.db.clone();
        let monitor_id = monitor.id;
        tokio::spawn(async move {
            if let Err(e) = db.update_last_heartbeat(monitor_id, now as i64).await {
                warn!(monitor_id, error = %e, "failed to persist last_heartbeat_at");
            }
        });
    }

    Ok(Json(json!({ "status": "ok" })))
}
