//! Message queue seam used by the notification relay
//!
//! Producers publish raw JSON payloads to a named queue; the relay consumes them
//! as a stream. RabbitMQ backs this in production.

mod rabbitmq;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

pub use rabbitmq::RabbitMqQueue;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue connection error: {0}")]
    Connection(String),

    #[error("Failed to publish to {queue}: {reason}")]
    Publish { queue: String, reason: String },

    #[error("Failed to consume from {queue}: {reason}")]
    Consume { queue: String, reason: String },

    #[error("Consumer stream ended before shutdown")]
    StreamEnded,
}

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Enqueue a payload; returns once the broker has confirmed it
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError>;

    /// Open a consumer on `queue`. Messages are acknowledged on receipt.
    async fn consume(
        &self,
        queue: &str,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, QueueError>>, QueueError>;
}
