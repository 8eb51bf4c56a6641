//! Notification persistence

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::notifications::models::Notification;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, message, is_delivered, created_at, delivered_at";

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, user_id: Uuid, message: &str) -> Result<Notification>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Flip `is_delivered` if it is still false; returns whether this call did it
    async fn mark_delivered(&self, id: Uuid) -> Result<bool>;

    /// Oldest first
    async fn list_undelivered_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>>;

    /// Newest first
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>>;
}

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, user_id: Uuid, message: &str) -> Result<Notification> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (user_id, message, is_delivered)
            VALUES ($1, $2, FALSE)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert notification for {}: {:?}", user_id, e);
            AppError::Database(e)
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch notification {}: {:?}", id, e);
            AppError::Database(e)
        })
    }

    async fn mark_delivered(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_delivered = TRUE, delivered_at = NOW()
            WHERE id = $1 AND is_delivered = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark notification {} delivered: {:?}", id, e);
            AppError::Database(e)
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_undelivered_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1 AND is_delivered = FALSE
            ORDER BY created_at ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to list undelivered notifications for {}: {:?}",
                user_id,
                e
            );
            AppError::Database(e)
        })
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list notifications for {}: {:?}", user_id, e);
            AppError::Database(e)
        })
    }
}
