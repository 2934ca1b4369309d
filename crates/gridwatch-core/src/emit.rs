//! Post-transition side effects: a durable-store write and a bus publish,
//! both detached from the checker loop that decided the transition.

use chrono::{TimeZone, Utc};
use gridwatch_protocol::bus::{publish_json, Bus};
use gridwatch_protocol::db::Db;
use gridwatch_protocol::envelope::StatusChangeEnvelope;
use gridwatch_protocol::ROUTING_KEY_STATUS_CHANGE;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::warn;

pub struct Emitter {
    db: Db,
    bus: Bus,
    tasks: Mutex<JoinSet<()>>,
}

impl Emitter {
    pub fn new(db: Db, bus: Bus) -> Self {
        Self {
            db,
            bus,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Persist the transition and publish its envelope on a detached task,
    /// each opening its own bus channel so concurrent emits never share
    /// one. The caller must already have released the entry's lock.
    #[allow(clippy::too_many_arguments)]
    pub async fn emit_transition(
        &self,
        monitor_id: i64,
        channel_id: i64,
        name: String,
        address: String,
        notify_address: bool,
        is_online: bool,
        changed_at: i64,
        duration_sec: i64,
        outage_region: String,
        outage_group: String,
        notify_outage: bool,
    ) {
        let db = self.db.clone();
        let bus = self.bus.clone();
        let mut tasks = self.tasks.lock().await;
        tasks.spawn(async move {
            if let Err(e) = db.apply_transition(monitor_id, is_online, changed_at).await {
                warn!(monitor_id, error = %e, "failed to persist transition");
            }

            let when = Utc
                .timestamp_opt(changed_at, 0)
                .single()
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default();

            let envelope = StatusChangeEnvelope {
                monitor_id,
                channel_id,
                name,
                address,
                notify_address,
                is_online,
                duration_sec,
                when,
                outage_region,
                outage_group,
                notify_outage,
            };

            match bus.producer_channel().await {
                Ok(channel) => {
                    if let Err(e) =
                        publish_json(&channel, ROUTING_KEY_STATUS_CHANGE, &envelope).await
                    {
                        warn!(monitor_id, error = %e, "failed to publish status.change");
                    }
                }
                Err(e) => warn!(monitor_id, error = %e, "failed to open producer channel"),
            }
        });
    }

    /// Give in-flight detached tasks a bounded grace window before shutdown
    /// proceeds; anything still running past it is abandoned, which is why
    /// the last cycle's writes are allowed to be lost.
    pub async fn shutdown(&self, grace: std::time::Duration) {
        let mut tasks = self.tasks.lock().await;
        let _ = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
    }
}
