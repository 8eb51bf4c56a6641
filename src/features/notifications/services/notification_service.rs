use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::notifications::dtos::NotificationResponseDto;
use crate::features::notifications::models::{Notification, QueuedNotificationMessage};
use crate::features::notifications::NotificationRepository;
use crate::modules::queue::NotificationQueue;

/// Records notifications and hands them to the delivery queue
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    queue: Arc<dyn NotificationQueue>,
    queue_name: String,
}

impl NotificationService {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        queue: Arc<dyn NotificationQueue>,
        queue_name: String,
    ) -> Self {
        Self {
            repo,
            queue,
            queue_name,
        }
    }

    /// Store a notification for `user_id` and enqueue it.
    ///
    /// Only the store write can fail the call. A failed publish is logged and
    /// the record stays undelivered until the user's next connect re-enqueues it.
    pub async fn notify(&self, user_id: Uuid, message: String) -> Result<Notification> {
        let notification = self.repo.create(user_id, &message).await?;

        if let Err(e) = self.publish(&notification).await {
            tracing::error!(
                "Failed to enqueue notification {} for user {}: {}",
                notification.id,
                user_id,
                e
            );
        } else {
            tracing::debug!(
                "Notification {} enqueued for user {}",
                notification.id,
                user_id
            );
        }

        Ok(notification)
    }

    /// Re-enqueue every undelivered notification of `user_id`, returning how
    /// many were published
    pub async fn republish_undelivered(&self, user_id: Uuid) -> Result<usize> {
        let pending = self.repo.list_undelivered_for_user(user_id).await?;
        let mut published = 0;

        for notification in &pending {
            match self.publish(notification).await {
                Ok(()) => published += 1,
                Err(e) => tracing::warn!(
                    "Failed to re-enqueue notification {}: {}",
                    notification.id,
                    e
                ),
            }
        }

        if !pending.is_empty() {
            tracing::info!(
                "Re-enqueued {}/{} undelivered notifications for user {}",
                published,
                pending.len(),
                user_id
            );
        }

        Ok(published)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<NotificationResponseDto>> {
        let notifications = self.repo.list_for_user(user_id).await?;
        Ok(notifications
            .into_iter()
            .map(NotificationResponseDto::from)
            .collect())
    }

    async fn publish(&self, notification: &Notification) -> Result<()> {
        let payload = QueuedNotificationMessage::from(notification)
            .encode()
            .map_err(|e| AppError::Internal(format!("Failed to encode notification: {}", e)))?;

        self.queue.publish(&self.queue_name, payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::users::models::UserRole;
    use crate::shared::test_helpers::{seed_user, FailingQueue, InMemoryQueue, InMemoryStore};

    const QUEUE: &str = "notifications";

    #[tokio::test]
    async fn test_notify_stores_then_publishes() {
        let store = Arc::new(InMemoryStore::default());
        let queue = Arc::new(InMemoryQueue::default());
        let service = NotificationService::new(store.clone(), queue.clone(), QUEUE.to_string());
        let user = seed_user(&store, UserRole::Client).await;

        let record = service
            .notify(user.id, "Tender awarded".to_string())
            .await
            .unwrap();

        assert!(!record.is_delivered);
        let published = queue.published(QUEUE);
        assert_eq!(published.len(), 1);
        let message = QueuedNotificationMessage::decode(&published[0]).unwrap();
        assert_eq!(message, QueuedNotificationMessage::from(&record));
    }

    #[tokio::test]
    async fn test_notify_keeps_record_when_queue_is_down() {
        let store = Arc::new(InMemoryStore::default());
        let service = NotificationService::new(store.clone(), Arc::new(FailingQueue), QUEUE.to_string());
        let user = seed_user(&store, UserRole::Client).await;

        let record = service.notify(user.id, "Tender awarded".to_string()).await;

        assert!(record.is_ok());
        assert_eq!(store.notifications_for(user.id).len(), 1);
    }

    #[tokio::test]
    async fn test_republish_only_sends_undelivered() {
        let store = Arc::new(InMemoryStore::default());
        let queue = Arc::new(InMemoryQueue::default());
        let service = NotificationService::new(store.clone(), queue.clone(), QUEUE.to_string());
        let user = seed_user(&store, UserRole::Contractor).await;

        let delivered = service.notify(user.id, "first".to_string()).await.unwrap();
        service.notify(user.id, "second".to_string()).await.unwrap();
        store.mark_delivered(delivered.id).await.unwrap();

        let republished = service.republish_undelivered(user.id).await.unwrap();

        assert_eq!(republished, 1);
        let last = queue.published(QUEUE).pop().unwrap();
        assert_eq!(
            QueuedNotificationMessage::decode(&last).unwrap().message,
            "second"
        );
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_user() {
        let store = Arc::new(InMemoryStore::default());
        let queue = Arc::new(InMemoryQueue::default());
        let service = NotificationService::new(store.clone(), queue, QUEUE.to_string());
        let alice = seed_user(&store, UserRole::Client).await;
        let bob = seed_user(&store, UserRole::Client).await;

        service.notify(alice.id, "for alice".to_string()).await.unwrap();

        assert_eq!(service.list_for_user(alice.id).await.unwrap().len(), 1);
        assert!(service.list_for_user(bob.id).await.unwrap().is_empty());
    }
}
