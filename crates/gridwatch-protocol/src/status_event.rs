//! Append-only status-event log. One row per detected transition; never
//! mutated; cascade-deleted with the owning monitor.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StatusEvent {
    pub id: i64,
    pub monitor_id: i64,
    pub is_online: bool,
    pub timestamp: i64,
}
