use std::sync::Arc;

use futures_util::StreamExt;
use gridwatch_protocol::bus::Bus;
use gridwatch_protocol::db::Db;
use gridwatch_protocol::envelope::{OutagePhotoEnvelope, PhotoAction};
use gridwatch_protocol::QUEUE_OUTAGE_PHOTO;
use lapin::options::BasicAckOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chat_client::{ChatClient, ChatError};
use crate::consumer::handle_channel_access_loss;

const PHOTO_FILENAME_FALLBACK: &str = "outage.png";

pub async fn run(
    bus: Bus,
    db: Db,
    chat: Arc<dyn ChatClient>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let channel = bus.consumer_channel(1).await?;
    let mut consumer = bus
        .consume(&channel, QUEUE_OUTAGE_PHOTO, "delivery.outage_photo")
        .await?;

    info!("outage.photo consumer started");
    loop {
        let delivery = tokio::select! {
            _ = cancel.cancelled() => {
                info!("outage.photo consumer shutting down");
                return Ok(());
            }
            next = consumer.next() => next,
        };

        let Some(delivery) = delivery else {
            warn!("outage.photo consumer stream ended");
            return Ok(());
        };
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                error!(error = %e, "outage.photo consumer error");
                continue;
            }
        };

        let envelope: OutagePhotoEnvelope = match serde_json::from_slice(&delivery.data) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(error = %e, "outage.photo: malformed envelope, acking and dropping");
                let _ = delivery.ack(BasicAckOptions::default()).await;
                continue;
            }
        };

        handle_envelope(&db, chat.as_ref(), &envelope).await;

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            error!(error = %e, "outage.photo: failed to ack delivery");
        }
    }
}

async fn handle_envelope(db: &Db, chat: &dyn ChatClient, envelope: &OutagePhotoEnvelope) {
    if envelope.channel_id == 0 {
        info!(monitor_id = envelope.monitor_id, "outage.photo: no channel configured, skipping");
        return;
    }

    match envelope.action {
        PhotoAction::Send => send(db, chat, envelope).await,
        PhotoAction::Edit => edit(db, chat, envelope).await,
        PhotoAction::Delete => delete(db, chat, envelope).await,
    }
}

async fn send(db: &Db, chat: &dyn ChatClient, envelope: &OutagePhotoEnvelope) {
    let Some(image) = envelope.image_data.as_deref() else {
        warn!(monitor_id = envelope.monitor_id, "outage.photo send with no image data");
        return;
    };
    let filename = envelope.filename.as_deref().unwrap_or(PHOTO_FILENAME_FALLBACK);

    match chat.send_photo(envelope.channel_id, image, filename, None).await {
        Ok(new_msg_id) => {
            if let Err(e) = db.update_photo_msg_id(envelope.monitor_id, Some(new_msg_id)).await {
                warn!(monitor_id = envelope.monitor_id, error = %e, "failed to persist outage photo message id");
            }
        }
        Err(ChatError::ChannelAccess(_)) => {
            handle_channel_access_loss(db, chat, envelope.monitor_id, envelope.channel_id).await;
        }
        Err(e) => {
            warn!(monitor_id = envelope.monitor_id, error = %e, "outage photo send failed");
        }
    }
}

async fn edit(db: &Db, chat: &dyn ChatClient, envelope: &OutagePhotoEnvelope) {
    let Some(image) = envelope.image_data.as_deref() else {
        warn!(monitor_id = envelope.monitor_id, "outage.photo edit with no image data");
        return;
    };
    let Some(old_msg_id) = envelope.old_msg_id else {
        send(db, chat, envelope).await;
        return;
    };
    let filename = envelope.filename.as_deref().unwrap_or(PHOTO_FILENAME_FALLBACK);

    match chat
        .edit_photo(envelope.channel_id, old_msg_id, image, filename, None)
        .await
    {
        Ok(()) => {}
        Err(ChatError::NotModified) => {}
        Err(ChatError::ChannelAccess(_)) => {
            handle_channel_access_loss(db, chat, envelope.monitor_id, envelope.channel_id).await;
        }
        Err(ChatError::Other(e)) => {
            warn!(monitor_id = envelope.monitor_id, error = %e, "outage photo edit failed, falling back to a new message");
            let _ = chat.delete_message(envelope.channel_id, old_msg_id).await;
            send(db, chat, envelope).await;
        }
    }
}

async fn delete(db: &Db, chat: &dyn ChatClient, envelope: &OutagePhotoEnvelope) {
    let Some(old_msg_id) = envelope.old_msg_id else {
        return;
    };
    match chat.delete_message(envelope.channel_id, old_msg_id).await {
        Ok(()) | Err(ChatError::NotModified) => {}
        Err(ChatError::ChannelAccess(_)) => {
            handle_channel_access_loss(db, chat, envelope.monitor_id, envelope.channel_id).await;
        }
        Err(ChatError::Other(e)) => {
            warn!(monitor_id = envelope.monitor_id, error = %e, "outage photo delete failed");
        }
    }
}
