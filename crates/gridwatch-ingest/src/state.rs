use std::sync::Arc;
use std::time::Duration;

use gridwatch_protocol::cache::Cache;
use gridwatch_protocol::db::Db;

use crate::heartbeat_gate::HeartbeatWriteGate;
use crate::map_cache::MapCache;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: Cache,
    pub map_cache: Arc<MapCache>,
    pub heartbeat_gate: Arc<HeartbeatWriteGate>,
}

impl AppState {
    pub fn new(db: Db, cache: Cache, map_cache_ttl: Duration, heartbeat_db_coalesce_seconds: i64) -> Self {
        Self {
            db,
            cache,
            map_cache: Arc::new(MapCache::new(map_cache_ttl)),
            heartbeat_gate: Arc::new(HeartbeatWriteGate::new(heartbeat_db_coalesce_seconds)),
        }
    }
}
