//! The durable message bus (RabbitMQ via AMQP 0-9-1). A single durable
//! topic exchange `nlm` with four durable queues, each bound to its routing
//! key. Declaration is idempotent, so every process that touches a given
//! queue/exchange pair may (re-)declare it.

use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind};
use serde::Serialize;

use crate::backoff::connect_with_backoff;
use crate::error::BusError;
use crate::{
    EXCHANGE_NAME, QUEUE_GRAPH_READY, QUEUE_GRAPH_REQUEST, QUEUE_OUTAGE_PHOTO,
    QUEUE_STATUS_CHANGE, ROUTING_KEY_GRAPH_READY, ROUTING_KEY_GRAPH_REQUEST,
    ROUTING_KEY_OUTAGE_PHOTO, ROUTING_KEY_STATUS_CHANGE,
};

const QUEUE_ROUTING_KEYS: [(&str, &str); 4] = [
    (QUEUE_STATUS_CHANGE, ROUTING_KEY_STATUS_CHANGE),
    (QUEUE_GRAPH_READY, ROUTING_KEY_GRAPH_READY),
    (QUEUE_OUTAGE_PHOTO, ROUTING_KEY_OUTAGE_PHOTO),
    (QUEUE_GRAPH_REQUEST, ROUTING_KEY_GRAPH_REQUEST),
];

#[derive(Clone)]
pub struct Bus {
    conn: Connection,
}

impl Bus {
    /// Connect with the shared startup backoff.
    pub async fn connect(amqp_url: &str) -> anyhow::Result<Self> {
        let conn = connect_with_backoff("rabbitmq", || {
            Connection::connect(amqp_url, ConnectionProperties::default())
        })
        .await?;
        Ok(Self { conn })
    }

    /// Declare the exchange and every queue/binding. Safe to call from more
    /// than one process at startup.
    pub async fn declare_topology(&self) -> Result<(), BusError> {
        let channel = self.conn.create_channel().await?;
        channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        for (queue, routing_key) in QUEUE_ROUTING_KEYS {
            channel
                .queue_declare(
                    queue,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await?;
            channel
                .queue_bind(
                    queue,
                    EXCHANGE_NAME,
                    routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        Ok(())
    }

    /// A dedicated channel for publishing. Bus channel objects are not
    /// thread-safe — each producer task owns one.
    pub async fn producer_channel(&self) -> Result<Channel, BusError> {
        Ok(self.conn.create_channel().await?)
    }

    /// A dedicated channel for consuming one queue at `prefetch=1`.
    pub async fn consumer_channel(&self, prefetch: u16) -> Result<Channel, BusError> {
        let channel = self.conn.create_channel().await?;
        channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await?;
        Ok(channel)
    }

    pub async fn consume(
        &self,
        channel: &Channel,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<Consumer, BusError> {
        Ok(channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?)
    }
}

/// Publish a JSON-serializable envelope with persistent delivery.
pub async fn publish_json<T: Serialize>(
    channel: &Channel,
    routing_key: &str,
    envelope: &T,
) -> Result<(), BusError> {
    let payload = serde_json::to_vec(envelope).expect("envelope types always serialize");
    channel
        .basic_publish(
            EXCHANGE_NAME,
            routing_key,
            BasicPublishOptions::default(),
            &payload,
            BasicProperties::default().with_delivery_mode(2),
        )
        .await?
        .await?;
    Ok(())
}
