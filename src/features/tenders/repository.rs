//! Tender persistence

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::tenders::models::{NewTender, Tender, TenderChanges};

const TENDER_COLUMNS: &str = "id, client_id, title, description, deadline, budget, status, \
                              awarded_bid_id, created_at, updated_at";

#[async_trait]
pub trait TenderRepository: Send + Sync {
    async fn create(&self, tender: NewTender) -> Result<Tender>;

    /// Newest first
    async fn list(&self) -> Result<Vec<Tender>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tender>>;

    /// Apply `changes` only while the tender is still open; `None` otherwise
    async fn update_open(&self, id: Uuid, changes: TenderChanges) -> Result<Option<Tender>>;

    /// Returns whether a row was deleted
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Atomically move an open tender to `awarded`, accept `bid_id` and reject
    /// every other bid on the tender.
    ///
    /// `None` when the tender is no longer open or the bid is not one of its bids;
    /// nothing is written in that case.
    async fn award(&self, tender_id: Uuid, bid_id: Uuid) -> Result<Option<Tender>>;
}

pub struct PgTenderRepository {
    pool: PgPool,
}

impl PgTenderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenderRepository for PgTenderRepository {
    async fn create(&self, tender: NewTender) -> Result<Tender> {
        sqlx::query_as::<_, Tender>(&format!(
            r#"
            INSERT INTO tenders (client_id, title, description, deadline, budget, status)
            VALUES ($1, $2, $3, $4, $5, 'open')
            RETURNING {TENDER_COLUMNS}
            "#
        ))
        .bind(tender.client_id)
        .bind(&tender.title)
        .bind(&tender.description)
        .bind(tender.deadline)
        .bind(tender.budget)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert tender: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn list(&self) -> Result<Vec<Tender>> {
        sqlx::query_as::<_, Tender>(&format!(
            "SELECT {TENDER_COLUMNS} FROM tenders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list tenders: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tender>> {
        sqlx::query_as::<_, Tender>(&format!(
            "SELECT {TENDER_COLUMNS} FROM tenders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch tender {}: {:?}", id, e);
            AppError::Database(e)
        })
    }

    async fn update_open(&self, id: Uuid, changes: TenderChanges) -> Result<Option<Tender>> {
        sqlx::query_as::<_, Tender>(&format!(
            r#"
            UPDATE tenders
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                deadline = COALESCE($4, deadline),
                budget = COALESCE($5, budget),
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1 AND status = 'open'
            RETURNING {TENDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.deadline)
        .bind(changes.budget)
        .bind(changes.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update tender {}: {:?}", id, e);
            AppError::Database(e)
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tenders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete tender {}: {:?}", id, e);
                AppError::Database(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn award(&self, tender_id: Uuid, bid_id: Uuid) -> Result<Option<Tender>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin award transaction: {:?}", e);
            AppError::Database(e)
        })?;

        let awarded = sqlx::query_as::<_, Tender>(&format!(
            r#"
            UPDATE tenders
            SET status = 'awarded', awarded_bid_id = $2, updated_at = NOW()
            WHERE id = $1
              AND status = 'open'
              AND EXISTS (SELECT 1 FROM bids WHERE id = $2 AND tender_id = $1)
            RETURNING {TENDER_COLUMNS}
            "#
        ))
        .bind(tender_id)
        .bind(bid_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to award tender {}: {:?}", tender_id, e);
            AppError::Database(e)
        })?;

        // Dropping the transaction rolls it back
        let Some(tender) = awarded else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE bids
            SET status = CASE WHEN id = $2 THEN 'accepted'::bid_status
                              ELSE 'rejected'::bid_status END
            WHERE tender_id = $1
            "#,
        )
        .bind(tender_id)
        .bind(bid_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to settle bids for tender {}: {:?}", tender_id, e);
            AppError::Database(e)
        })?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit award of tender {}: {:?}", tender_id, e);
            AppError::Database(e)
        })?;

        Ok(Some(tender))
    }
}
