//! The hot cache (Redis). Key space: `hb:<monitor_id>` = unix-seconds ASCII
//! integer, no TTL.

use redis::AsyncCommands;

use crate::backoff::connect_with_backoff;
use crate::error::CacheError;

pub fn heartbeat_key(monitor_id: i64) -> String {
    format!("hb:{monitor_id}")
}

#[derive(Clone)]
pub struct Cache {
    conn: redis::aio::ConnectionManager,
}

impl Cache {
    /// Connect with the shared startup backoff. Failure here is fatal at
    /// startup.
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = connect_with_backoff("redis", || {
            let client = client.clone();
            async move { client.get_connection_manager().await }
        })
        .await?;
        Ok(Self { conn })
    }

    /// Read the last heartbeat evidence for a monitor.
    ///
    /// `Ok(None)` means the key is absent, which is not an error — it's
    /// ordinary evidence of "nothing since the last cache wipe." Any other
    /// failure is a real infrastructure error and must not be treated as
    /// evidence of staleness.
    pub async fn get_heartbeat(&self, monitor_id: i64) -> Result<Option<u64>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<u64> = conn.get(heartbeat_key(monitor_id)).await?;
        Ok(value)
    }

    /// Write fresh heartbeat evidence for a monitor. No TTL — the value is
    /// simply overwritten on each subsequent ping.
    pub async fn set_heartbeat(&self, monitor_id: i64, unix_seconds: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(heartbeat_key(monitor_id), unix_seconds).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_key_format() {
        assert_eq!(heartbeat_key(42), "hb:42");
        assert_eq!(heartbeat_key(0), "hb:0");
    }
}
