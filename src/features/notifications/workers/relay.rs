use futures::{Stream, StreamExt};
use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::features::notifications::dtos::NotificationPushDto;
use crate::features::notifications::models::QueuedNotificationMessage;
use crate::features::notifications::registry::{ConnectionRegistry, SendOutcome};
use crate::features::notifications::NotificationRepository;
use crate::modules::queue::QueueError;

/// What happened to one queued message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Marked delivered; `pushed` tells whether a live socket received it
    Processed { pushed: bool },
    SkippedMalformed,
    SkippedAlreadyDelivered,
    SkippedUnknown,
    SkippedStoreError,
}

#[derive(Debug, Default)]
pub struct RelayStats {
    processed: AtomicU64,
    pushed: AtomicU64,
    malformed: AtomicU64,
    already_delivered: AtomicU64,
    unknown: AtomicU64,
    store_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStatsSnapshot {
    pub processed: u64,
    pub pushed: u64,
    pub malformed: u64,
    pub already_delivered: u64,
    pub unknown: u64,
    pub store_errors: u64,
}

impl RelayStats {
    fn record(&self, outcome: DeliveryOutcome) {
        let counter = match outcome {
            DeliveryOutcome::Processed { pushed } => {
                if pushed {
                    self.pushed.fetch_add(1, Ordering::Relaxed);
                }
                &self.processed
            }
            DeliveryOutcome::SkippedMalformed => &self.malformed,
            DeliveryOutcome::SkippedAlreadyDelivered => &self.already_delivered,
            DeliveryOutcome::SkippedUnknown => &self.unknown,
            DeliveryOutcome::SkippedStoreError => &self.store_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            pushed: self.pushed.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            already_delivered: self.already_delivered.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

/// Consumes queued notifications, marks them delivered and pushes them to
/// connected users
pub struct NotificationRelay {
    repo: Arc<dyn NotificationRepository>,
    registry: Arc<ConnectionRegistry>,
    workers: usize,
    stats: Arc<RelayStats>,
}

impl NotificationRelay {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        registry: Arc<ConnectionRegistry>,
        workers: usize,
    ) -> Self {
        Self {
            repo,
            registry,
            workers: workers.max(1),
            stats: Arc::new(RelayStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    /// Consume `messages` until `shutdown` flips to true.
    ///
    /// On shutdown no new message is taken; messages already being handled
    /// run to completion. A stream that ends on its own means the broker
    /// consumer is gone and is reported as `QueueError::StreamEnded`.
    pub async fn run<S>(
        &self,
        messages: S,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), QueueError>
    where
        S: Stream<Item = Result<Vec<u8>, QueueError>> + Send,
    {
        tracing::info!("Starting notification relay with {} workers", self.workers);

        let shutting_down = shutdown.clone();
        let stop = async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        };

        let mut messages = pin!(messages.take_until(stop));
        messages
            .as_mut()
            .for_each_concurrent(self.workers, |item| async move {
                match item {
                    Ok(payload) => {
                        self.process_message(&payload).await;
                    }
                    Err(e) => tracing::warn!("Notification queue error: {}", e),
                }
            })
            .await;

        if messages.is_stopped() || *shutting_down.borrow() {
            tracing::info!(
                "Notification relay stopped: {:?}",
                self.stats.snapshot()
            );
            Ok(())
        } else {
            tracing::error!(
                "Notification queue consumer ended unexpectedly: {:?}",
                self.stats.snapshot()
            );
            Err(QueueError::StreamEnded)
        }
    }

    /// Handle one payload. Replaying a message never delivers it twice.
    pub async fn process_message(&self, payload: &[u8]) -> DeliveryOutcome {
        let outcome = self.deliver(payload).await;
        self.stats.record(outcome);
        outcome
    }

    async fn deliver(&self, payload: &[u8]) -> DeliveryOutcome {
        let message = match QueuedNotificationMessage::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Skipping malformed notification payload: {}", e);
                return DeliveryOutcome::SkippedMalformed;
            }
        };

        let record = match self.repo.find_by_id(message.id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!("Skipping unknown notification {}", message.id);
                return DeliveryOutcome::SkippedUnknown;
            }
            Err(e) => {
                tracing::error!("Failed to load notification {}: {}", message.id, e);
                return DeliveryOutcome::SkippedStoreError;
            }
        };

        if record.is_delivered {
            tracing::debug!("Notification {} already delivered", record.id);
            return DeliveryOutcome::SkippedAlreadyDelivered;
        }

        // A concurrent worker may have won the flip since the read above
        match self.repo.mark_delivered(record.id).await {
            Ok(true) => {}
            Ok(false) => return DeliveryOutcome::SkippedAlreadyDelivered,
            Err(e) => {
                tracing::error!("Failed to mark notification {} delivered: {}", record.id, e);
                return DeliveryOutcome::SkippedStoreError;
            }
        }

        let frame = NotificationPushDto {
            id: record.id,
            message: record.message,
        };
        let pushed = match serde_json::to_string(&frame) {
            Ok(text) => self.registry.send(record.user_id, text) == SendOutcome::Delivered,
            Err(e) => {
                tracing::error!("Failed to encode push for {}: {}", record.id, e);
                false
            }
        };

        tracing::debug!(
            "Notification {} delivered to user {} (pushed: {})",
            record.id,
            record.user_id,
            pushed
        );
        DeliveryOutcome::Processed { pushed }
    }
}
