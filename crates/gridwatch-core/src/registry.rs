//! The authoritative in-memory monitor registry.
//!
//! A concurrent map keyed by token, with a per-entry mutex guarding the
//! mutable status and config fields. This is the only in-process mutable
//! state in Liveness Core.

use std::sync::atomic::AtomicI64;
use std::sync::Arc;

use dashmap::DashMap;
use gridwatch_protocol::monitor::{Monitor, MonitorConfig, MonitorType};
use tokio::sync::Mutex;

/// Mutable fields, guarded by `MonitorEntry::lock`. Everything else about a
/// monitor (id, token, type, ping target) is immutable for the entry's
/// lifetime — a genuine change there means delete-and-recreate, not a
/// mutation.
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
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
    pub last_status_change_at: i64,
}

pub struct MonitorEntry {
    pub id: i64,
    pub token: String,
    pub monitor_type: MonitorType,
    pub ping_target: String,
    pub state: Mutex<MonitorState>,
    /// Unix-seconds of the last durable-store write of `last_heartbeat_at`
    /// for this monitor, checked without taking `state`'s lock so the
    /// coalescing gate stays cheap on a chatty device.
    pub last_heartbeat_db_write_at: AtomicI64,
}

impl MonitorEntry {
    fn from_monitor(m: &Monitor) -> Arc<Self> {
        Arc::new(Self {
            id: m.id,
            token: m.token.clone(),
            monitor_type: m.monitor_type,
            ping_target: m.ping_target.clone(),
            state: Mutex::new(MonitorState {
                name: m.name.clone(),
                address: m.address.clone(),
                lat: m.lat,
                lng: m.lng,
                channel_id: m.channel_id,
                is_online: m.is_online,
                is_active: m.is_active,
                is_public: m.is_public,
                notify_address: m.notify_address,
                notify_outage: m.notify_outage,
                outage_region: m.outage_region.clone(),
                outage_group: m.outage_group.clone(),
                outage_photo_enabled: m.outage_photo_enabled,
                graph_enabled: m.graph_enabled,
                last_status_change_at: m.last_status_change_at,
            }),
            last_heartbeat_db_write_at: AtomicI64::new(0),
        })
    }

    /// `true` and reserves the slot if a durable-store write of
    /// `last_heartbeat_at` is due (coalesced to at most one per
    /// `coalesce_seconds`). Reservation happens via a compare-and-swap so
    /// concurrent callers for the same entry don't both win.
    pub fn should_write_heartbeat_to_db(&self, now: i64, coalesce_seconds: i64) -> bool {
        use std::sync::atomic::Ordering;
        let last = self.last_heartbeat_db_write_at.load(Ordering::Relaxed);
        if now - last < coalesce_seconds {
            return false;
        }
        self.last_heartbeat_db_write_at
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }
}

/// Concurrent registry: token → entry, plus a secondary index by monitor id
/// so the config-sync loop and deletions don't need to scan every token.
pub struct MonitorRegistry {
    by_token: DashMap<String, Arc<MonitorEntry>>,
    id_to_token: DashMap<i64, String>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self {
            by_token: DashMap::new(),
            id_to_token: DashMap::new(),
        }
    }

    /// Load every monitor at startup.
    pub fn load(monitors: &[Monitor]) -> Self {
        let registry = Self::new();
        for m in monitors {
            registry.insert(m);
        }
        registry
    }

    pub fn insert(&self, m: &Monitor) {
        let entry = MonitorEntry::from_monitor(m);
        self.id_to_token.insert(m.id, m.token.clone());
        self.by_token.insert(m.token.clone(), entry);
    }

    pub fn remove_by_id(&self, monitor_id: i64) {
        if let Some((_, token)) = self.id_to_token.remove(&monitor_id) {
            self.by_token.remove(&token);
        }
    }

    pub fn get_by_token(&self, token: &str) -> Option<Arc<MonitorEntry>> {
        self.by_token.get(token).map(|e| Arc::clone(e.value()))
    }

    pub fn contains_id(&self, monitor_id: i64) -> bool {
        self.id_to_token.contains_key(&monitor_id)
    }

    /// Snapshot of every entry, for the checker tickers to iterate over
    /// without holding the map locked for the whole cycle.
    pub fn snapshot(&self) -> Vec<Arc<MonitorEntry>> {
        self.by_token.iter().map(|e| Arc::clone(e.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    /// Apply an externally-sourced config update to a matching entry.
    /// Never touches `is_online` or `last_status_change_at` — those are
    /// Liveness Core's alone to write.
    pub async fn apply_config(&self, config: &MonitorConfig) {
        let Some(token) = self.id_to_token.get(&config.id).map(|t| t.clone()) else {
            return;
        };
        let Some(entry) = self.by_token.get(&token) else {
            return;
        };
        let mut state = entry.state.lock().await;
        state.name = config.name.clone();
        state.address = config.address.clone();
        state.lat = config.lat;
        state.lng = config.lng;
        state.channel_id = config.channel_id;
        state.is_active = config.is_active;
        state.is_public = config.is_public;
        state.notify_address = config.notify_address;
        state.notify_outage = config.notify_outage;
        state.outage_region = config.outage_region.clone();
        state.outage_group = config.outage_group.clone();
        state.outage_photo_enabled = config.outage_photo_enabled;
        state.graph_enabled = config.graph_enabled;
    }

    pub fn all_ids(&self) -> Vec<i64> {
        self.id_to_token.iter().map(|e| *e.key()).collect()
    }
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_protocol::monitor::MonitorType;

    fn sample_monitor(id: i64, token: &str) -> Monitor {
        Monitor {
            id,
            token: token.to_string(),
            settings_token: format!("{token}-settings"),
            owner_id: 1,
            name: "Site".to_string(),
            address: "".to_string(),
            lat: 0.0,
            lng: 0.0,
            monitor_type: MonitorType::Heartbeat,
            ping_target: "".to_string(),
            channel_id: 0,
            is_online: false,
            is_active: true,
            is_public: false,
            notify_address: false,
            notify_outage: false,
            outage_region: "".to_string(),
            outage_group: "".to_string(),
            outage_photo_enabled: false,
            graph_enabled: false,
            last_heartbeat_at: 0,
            last_status_change_at: 0,
        }
    }

    #[tokio::test]
    async fn insert_lookup_and_remove() {
        let registry = MonitorRegistry::new();
        registry.insert(&sample_monitor(1, "tok-a"));

        let entry = registry.get_by_token("tok-a").expect("present");
        assert_eq!(entry.id, 1);
        assert!(registry.contains_id(1));

        registry.remove_by_id(1);
        assert!(registry.get_by_token("tok-a").is_none());
        assert!(!registry.contains_id(1));
    }

    #[tokio::test]
    async fn config_sync_never_touches_status_fields() {
        let registry = MonitorRegistry::new();
        let mut m = sample_monitor(2, "tok-b");
        m.is_online = true;
        m.last_status_change_at = 555;
        registry.insert(&m);

        let config = MonitorConfig {
            id: 2,
            name: "Renamed".to_string(),
            address: "New Addr".to_string(),
            lat: 1.0,
            lng: 2.0,
            ping_target: "".to_string(),
            channel_id: 99,
            is_active: false,
            is_public: true,
            notify_address: true,
            notify_outage: true,
            outage_region: "kyiv".to_string(),
            outage_group: "3.1".to_string(),
            outage_photo_enabled: true,
            graph_enabled: true,
        };
        registry.apply_config(&config).await;

        let entry = registry.get_by_token("tok-b").expect("present");
        let state = entry.state.lock().await;
        assert_eq!(state.name, "Renamed");
        assert_eq!(state.channel_id, 99);
        assert!(!state.is_active);
        // Untouched by config sync:
        assert!(state.is_online);
        assert_eq!(state.last_status_change_at, 555);
    }

    #[tokio::test]
    async fn heartbeat_db_write_is_coalesced() {
        let registry = MonitorRegistry::new();
        registry.insert(&sample_monitor(3, "tok-c"));
        let entry = registry.get_by_token("tok-c").expect("present");

        assert!(entry.should_write_heartbeat_to_db(1000, 30));
        assert!(!entry.should_write_heartbeat_to_db(1010, 30));
        assert!(!entry.should_write_heartbeat_to_db(1029, 30));
        assert!(entry.should_write_heartbeat_to_db(1030, 30));
    }
}
