use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use lapin::{
    options::{
        BasicConsumeOptions, BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use std::sync::Arc;

use super::{NotificationQueue, QueueError};

const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// RabbitMQ-backed queue using the default exchange (routing key = queue name)
pub struct RabbitMqQueue {
    _connection: Arc<Connection>,
    channel: Channel,
}

impl RabbitMqQueue {
    /// Connect and declare every queue in `queues` as durable
    pub async fn connect(url: &str, queues: &[&str]) -> Result<Self, QueueError> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to connect to RabbitMQ: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to create channel: {e}")))?;

        // Publishes wait for the broker's ack
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to enable publisher confirms: {e}")))?;

        for queue in queues {
            declare_queue(&channel, queue).await?;
        }

        tracing::info!("Connected to RabbitMQ, declared queues: {:?}", queues);

        Ok(Self {
            _connection: Arc::new(connection),
            channel,
        })
    }
}

async fn declare_queue(channel: &Channel, queue: &str) -> Result<(), QueueError> {
    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| QueueError::Connection(format!("Failed to declare queue {queue}: {e}")))?;
    Ok(())
}

#[async_trait]
impl NotificationQueue for RabbitMqQueue {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(PERSISTENT_DELIVERY_MODE);

        let confirmation = self
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(|e| QueueError::Publish {
                queue: queue.to_string(),
                reason: e.to_string(),
            })?
            .await
            .map_err(|e| QueueError::Publish {
                queue: queue.to_string(),
                reason: e.to_string(),
            })?;

        if confirmation.is_nack() {
            return Err(QueueError::Publish {
                queue: queue.to_string(),
                reason: "broker rejected the message".to_string(),
            });
        }

        tracing::debug!("Published {} bytes to queue '{}'", payload.len(), queue);
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, QueueError>>, QueueError> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                "notification-relay",
                BasicConsumeOptions {
                    no_ack: true,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| QueueError::Consume {
                queue: queue.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!("Consuming from queue '{}'", queue);

        let queue = queue.to_string();
        let stream = consumer.map(move |delivery| {
            delivery
                .map(|delivery| delivery.data)
                .map_err(|e| QueueError::Consume {
                    queue: queue.clone(),
                    reason: e.to_string(),
                })
        });

        Ok(stream.boxed())
    }
}
