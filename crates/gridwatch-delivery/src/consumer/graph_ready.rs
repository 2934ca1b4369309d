use std::sync::Arc;

use futures_util::StreamExt;
use gridwatch_protocol::bus::Bus;
use gridwatch_protocol::db::Db;
use gridwatch_protocol::envelope::GraphReadyEnvelope;
use gridwatch_protocol::QUEUE_GRAPH_READY;
use lapin::options::BasicAckOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chat_client::{ChatClient, ChatError};
use crate::consumer::handle_channel_access_loss;

const GRAPH_FILENAME: &str = "graph.png";

pub async fn run(
    bus: Bus,
    db: Db,
    chat: Arc<dyn ChatClient>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let channel = bus.consumer_channel(1).await?;
    let mut consumer = bus
        .consume(&channel, QUEUE_GRAPH_READY, "delivery.graph_ready")
        .await?;

    info!("graph.ready consumer started");
    loop {
        let delivery = tokio::select! {
            _ = cancel.cancelled() => {
                info!("graph.ready consumer shutting down");
                return Ok(());
            }
            next = consumer.next() => next,
        };

        let Some(delivery) = delivery else {
            warn!("graph.ready consumer stream ended");
            return Ok(());
        };
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                error!(error = %e, "graph.ready consumer error");
                continue;
            }
        };

        let envelope: GraphReadyEnvelope = match serde_json::from_slice(&delivery.data) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(error = %e, "graph.ready: malformed envelope, acking and dropping");
                let _ = delivery.ack(BasicAckOptions::default()).await;
                continue;
            }
        };

        handle_envelope(&db, chat.as_ref(), &envelope).await;

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            error!(error = %e, "graph.ready: failed to ack delivery");
        }
    }
}

async fn handle_envelope(db: &Db, chat: &dyn ChatClient, envelope: &GraphReadyEnvelope) {
    if envelope.channel_id == 0 {
        info!(monitor_id = envelope.monitor_id, "graph.ready: no channel configured, skipping");
        return;
    }

    if envelope.needs_new_msg {
        send_new(db, chat, envelope).await;
        return;
    }

    let Some(old_msg_id) = envelope.old_msg_id else {
        send_new(db, chat, envelope).await;
        return;
    };

    match chat
        .edit_photo(
            envelope.channel_id,
            old_msg_id,
            &envelope.image_png,
            GRAPH_FILENAME,
            Some(&envelope.caption),
        )
        .await
    {
        Ok(()) => {}
        Err(ChatError::NotModified) => {}
        Err(ChatError::ChannelAccess(_)) => {
            handle_channel_access_loss(db, chat, envelope.monitor_id, envelope.channel_id).await;
        }
        Err(ChatError::Other(e)) => {
            warn!(monitor_id = envelope.monitor_id, error = %e, "graph edit failed, falling back to a new message");
            let _ = chat.delete_message(envelope.channel_id, old_msg_id).await;
            send_new(db, chat, envelope).await;
        }
    }
}

async fn send_new(db: &Db, chat: &dyn ChatClient, envelope: &GraphReadyEnvelope) {
    match chat
        .send_photo(
            envelope.channel_id,
            &envelope.image_png,
            GRAPH_FILENAME,
            Some(&envelope.caption),
        )
        .await
    {
        Ok(new_msg_id) => {
            if let Err(e) = db
                .update_graph_state(envelope.monitor_id, Some(new_msg_id), &envelope.week_start)
                .await
            {
                warn!(monitor_id = envelope.monitor_id, error = %e, "failed to persist graph message id");
            }
        }
        Err(ChatError::ChannelAccess(_)) => {
            handle_channel_access_loss(db, chat, envelope.monitor_id, envelope.channel_id).await;
        }
        Err(e) => {
            warn!(monitor_id = envelope.monitor_id, error = %e, "graph send failed");
        }
    }
}
