pub mod graph_ready;
pub mod outage_photo;
pub mod status_change;

use gridwatch_protocol::db::Db;
use tracing::warn;

use crate::chat_client::ChatClient;

/// The shared channel-access-loss path: pause the monitor, attempt a
/// best-effort notice in the channel itself, and DM the owner. Both
/// notices are best-effort — a bot that was just kicked will often fail to
/// send the very notice explaining why.
pub async fn handle_channel_access_loss(
    db: &Db,
    chat: &dyn ChatClient,
    monitor_id: i64,
    channel_id: i64,
) {
    if let Err(e) = db.set_active(monitor_id, false).await {
        warn!(monitor_id, error = %e, "failed to auto-pause monitor after channel access loss");
    }

    let notice = "This monitor has been paused: the bot lost access to its channel.";
    let _ = chat.send_message(channel_id, notice).await;

    match db.owner_telegram_id(monitor_id).await {
        Ok(Some(owner_id)) => {
            let _ = chat.send_message(owner_id, notice).await;
        }
        Ok(None) => warn!(monitor_id, "no owner found to notify of channel access loss"),
        Err(e) => warn!(monitor_id, error = %e, "failed to look up monitor owner"),
    }
}

#[cfg(test)]
mod tests {
    //! Channel-access-lost scenario, against a real D (gated, same
    //! convention `db_integration.rs` uses elsewhere) and a stub chat API
    //! standing in for the vendor-specific bot surface.

    use std::sync::Mutex;

    use async_trait::async_trait;
    use gridwatch_protocol::error::ChannelAccessError;

    use super::*;
    use crate::chat_client::ChatError;

    macro_rules! skip_if_no_db {
        () => {
            match std::env::var("TEST_DATABASE_URL") {
                Ok(url) => url,
                Err(_) => {
                    eprintln!("skipping: TEST_DATABASE_URL not set");
                    return;
                }
            }
        };
    }

    fn rand_id() -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos() as i64
    }

    async fn seed_monitor(db: &Db, owner_telegram_id: i64) -> i64 {
        let pool = db.pool();
        let (owner_id,): (i64,) = sqlx::query_as(
            "INSERT INTO users (telegram_id, created_at) VALUES ($1, 0) RETURNING id",
        )
        .bind(owner_telegram_id)
        .fetch_one(pool)
        .await
        .expect("insert user");

        let token = format!("tok-{}", rand_id());
        let (monitor_id,): (i64,) = sqlx::query_as(
            "INSERT INTO monitors (token, settings_token, owner_id, name, monitor_type) \
             VALUES ($1, $2, $3, 'Pump house', 'heartbeat') RETURNING id",
        )
        .bind(&token)
        .bind(format!("{token}-settings"))
        .bind(owner_id)
        .fetch_one(pool)
        .await
        .expect("insert monitor");

        monitor_id
    }

    struct KickedChatClient {
        sent_to: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl ChatClient for KickedChatClient {
        async fn send_message(&self, channel_id: i64, _text: &str) -> Result<i64, ChatError> {
            self.sent_to.lock().unwrap().push(channel_id);
            Err(ChatError::ChannelAccess(ChannelAccessError::BotKicked))
        }
        async fn send_photo(
            &self,
            _channel_id: i64,
            _image: &[u8],
            _filename: &str,
            _caption: Option<&str>,
        ) -> Result<i64, ChatError> {
            unimplemented!("not exercised by this scenario")
        }
        async fn edit_photo(
            &self,
            _channel_id: i64,
            _message_id: i64,
            _image: &[u8],
            _filename: &str,
            _caption: Option<&str>,
        ) -> Result<(), ChatError> {
            unimplemented!("not exercised by this scenario")
        }
        async fn delete_message(&self, _channel_id: i64, _message_id: i64) -> Result<(), ChatError> {
            unimplemented!("not exercised by this scenario")
        }
    }

    #[tokio::test]
    async fn channel_access_loss_pauses_monitor_and_notifies_owner() {
        let url = skip_if_no_db!();
        let db = Db::connect(&url, true).await.expect("connect");
        let owner_telegram_id = rand_id();
        let monitor_id = seed_monitor(&db, owner_telegram_id).await;

        let chat = KickedChatClient {
            sent_to: Mutex::new(Vec::new()),
        };
        handle_channel_access_loss(&db, &chat, monitor_id, 999).await;

        let monitor = db.get(monitor_id).await.expect("query").expect("present");
        assert!(!monitor.is_active);

        let sent_to = chat.sent_to.lock().unwrap();
        assert!(sent_to.contains(&999));
        assert!(sent_to.contains(&owner_telegram_id));
    }
}
