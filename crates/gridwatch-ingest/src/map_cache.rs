//! A short-TTL in-process cache for the public map response. Keeps the
//! read path off the database's hot path without introducing a second
//! cache tier — the data is already public and a few seconds of staleness
//! is acceptable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

pub struct MapCache {
    ttl: Duration,
    slot: Mutex<Option<(Instant, Arc<str>)>>,
}

impl MapCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached body if still fresh, otherwise `None`.
    pub async fn get(&self) -> Option<Arc<str>> {
        let slot = self.slot.lock().await;
        match &*slot {
            Some((stored_at, body)) if stored_at.elapsed() < self.ttl => Some(Arc::clone(body)),
            _ => None,
        }
    }

    pub async fn set(&self, body: Arc<str>) {
        let mut slot = self.slot.lock().await;
        *slot = Some((Instant::now(), body));
    }
}
