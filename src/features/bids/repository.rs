//! Bid persistence

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::bids::models::{Bid, NewBid};

const BID_COLUMNS: &str =
    "id, tender_id, contractor_id, price, delivery_time, comments, status, created_at";

#[async_trait]
pub trait BidRepository: Send + Sync {
    async fn create(&self, bid: NewBid) -> Result<Bid>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Bid>>;

    /// Oldest first
    async fn list_by_tender(&self, tender_id: Uuid) -> Result<Vec<Bid>>;

    /// Newest first
    async fn list_by_contractor(&self, contractor_id: Uuid) -> Result<Vec<Bid>>;

    /// Delete the bid only if it belongs to `contractor_id` and is still pending
    async fn delete_pending(&self, id: Uuid, contractor_id: Uuid) -> Result<bool>;
}

pub struct PgBidRepository {
    pool: PgPool,
}

impl PgBidRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BidRepository for PgBidRepository {
    async fn create(&self, bid: NewBid) -> Result<Bid> {
        sqlx::query_as::<_, Bid>(&format!(
            r#"
            INSERT INTO bids (tender_id, contractor_id, price, delivery_time, comments, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING {BID_COLUMNS}
            "#
        ))
        .bind(bid.tender_id)
        .bind(bid.contractor_id)
        .bind(bid.price)
        .bind(bid.delivery_time)
        .bind(&bid.comments)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert bid: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Bid>> {
        sqlx::query_as::<_, Bid>(&format!("SELECT {BID_COLUMNS} FROM bids WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch bid {}: {:?}", id, e);
                AppError::Database(e)
            })
    }

    async fn list_by_tender(&self, tender_id: Uuid) -> Result<Vec<Bid>> {
        sqlx::query_as::<_, Bid>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE tender_id = $1 ORDER BY created_at ASC"
        ))
        .bind(tender_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list bids for tender {}: {:?}", tender_id, e);
            AppError::Database(e)
        })
    }

    async fn list_by_contractor(&self, contractor_id: Uuid) -> Result<Vec<Bid>> {
        sqlx::query_as::<_, Bid>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE contractor_id = $1 ORDER BY created_at DESC"
        ))
        .bind(contractor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to list bids for contractor {}: {:?}",
                contractor_id,
                e
            );
            AppError::Database(e)
        })
    }

    async fn delete_pending(&self, id: Uuid, contractor_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM bids WHERE id = $1 AND contractor_id = $2 AND status = 'pending'",
        )
        .bind(id)
        .bind(contractor_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete bid {}: {:?}", id, e);
            AppError::Database(e)
        })?;

        Ok(result.rows_affected() > 0)
    }
}
