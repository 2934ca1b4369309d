use futures_util::StreamExt;
use gridwatch_protocol::bus::Bus;
use gridwatch_protocol::db::Db;
use gridwatch_protocol::envelope::StatusChangeEnvelope;
use gridwatch_protocol::QUEUE_STATUS_CHANGE;
use gridwatch_schedule::client::ScheduleClient;
use lapin::options::BasicAckOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chat_client::{ChatClient, ChatError};
use crate::consumer::handle_channel_access_loss;
use crate::render::render_status_change;

pub async fn run(
    bus: Bus,
    db: Db,
    chat: std::sync::Arc<dyn ChatClient>,
    schedule: std::sync::Arc<dyn ScheduleClient>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let channel = bus.consumer_channel(1).await?;
    let mut consumer = bus
        .consume(&channel, QUEUE_STATUS_CHANGE, "delivery.status_change")
        .await?;

    info!("status.change consumer started");
    loop {
        let delivery = tokio::select! {
            _ = cancel.cancelled() => {
                info!("status.change consumer shutting down");
                return Ok(());
            }
            next = consumer.next() => next,
        };

        let Some(delivery) = delivery else {
            warn!("status.change consumer stream ended");
            return Ok(());
        };
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                error!(error = %e, "status.change consumer error");
                continue;
            }
        };

        let envelope: StatusChangeEnvelope = match serde_json::from_slice(&delivery.data) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(error = %e, "status.change: malformed envelope, acking and dropping");
                let _ = delivery.ack(BasicAckOptions::default()).await;
                continue;
            }
        };

        if envelope.channel_id == 0 {
            info!(monitor_id = envelope.monitor_id, "status.change: no channel configured, skipping send");
        } else {
            let text = render_status_change(schedule.as_ref(), &envelope).await;
            match chat.send_message(envelope.channel_id, &text).await {
                Ok(_) => {}
                Err(ChatError::ChannelAccess(_)) => {
                    handle_channel_access_loss(&db, chat.as_ref(), envelope.monitor_id, envelope.channel_id)
                        .await;
                }
                Err(ChatError::NotModified) => {}
                Err(ChatError::Other(e)) => {
                    warn!(monitor_id = envelope.monitor_id, error = %e, "status.change delivery failed, acking anyway");
                }
            }
        }

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            error!(error = %e, "status.change: failed to ack delivery");
        }
    }
}
