//! The `Monitor` row — identity in the durable store, hot replica in
//! Liveness Core memory.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum MonitorType {
    Heartbeat,
    Ping,
}

impl MonitorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorType::Heartbeat => "heartbeat",
            MonitorType::Ping => "ping",
        }
    }
}

/// Authoritative row shape, mirrored 1:1 by the in-memory registry entry
/// (gridwatch-core's `MonitorEntry`) and by D's `monitors` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Monitor {
    pub id: i64,
    pub token: String,
    pub settings_token: String,
    pub owner_id: i64,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub monitor_type: MonitorType,
    pub ping_target: String,
    pub channel_id: i64,
    pub is_online: bool,
    pub is_active: bool,
    pub is_public: bool,
    pub notify_address: bool,
    pub notify_outage: bool,
    pub outage_region: String,
    pub outage_group: String,
    pub outage_photo_enabled: bool,
    pub graph_enabled: bool,
    pub last_heartbeat_at: i64,
    pub last_status_change_at: i64,
}

impl Monitor {
    /// `true` when the Ingest/checker heartbeat path applies: an on-site
    /// device posts evidence rather than the service probing it.
    pub fn is_heartbeat(&self) -> bool {
        matches!(self.monitor_type, MonitorType::Heartbeat)
    }

    pub fn is_ping(&self) -> bool {
        matches!(self.monitor_type, MonitorType::Ping)
    }
}

/// The subset of `Monitor` columns an external command (settings/bot) may
/// edit. `is_online` and `last_status_change_at` are deliberately absent —
/// only Liveness Core authors those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MonitorConfig {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub ping_target: String,
    pub channel_id: i64,
    pub is_active: bool,
    pub is_public: bool,
    pub notify_address: bool,
    pub notify_outage: bool,
    pub outage_region: String,
    pub outage_group: String,
    pub outage_photo_enabled: bool,
    pub graph_enabled: bool,
}

/// A row in the public map read-path.
#[derive(Debug, Clone, Serialize)]
pub struct MapEntry {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub is_online: bool,
    pub monitor_type: MonitorType,
}
