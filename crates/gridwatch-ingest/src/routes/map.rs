//! `GET /api/map` — the public map read path, served from a short-TTL
//! in-process cache and rebuilt from the database on expiry.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

pub async fn handle_map(State(state): State<AppState>) -> Result<Response, StatusCode> {
    if let Some(body) = state.map_cache.get().await {
        return Ok(json_response(body));
    }

    let entries = state
        .db
        .list_public()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let body: Arc<str> = serde_json::to_string(&entries)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into();
    state.map_cache.set(Arc::clone(&body)).await;

    Ok(json_response(body))
}

fn json_response(body: Arc<str>) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body.to_string()).into_response()
}
