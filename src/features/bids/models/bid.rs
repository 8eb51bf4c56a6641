use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Mirrors the `bid_status` Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "bid_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, FromRow)]
pub struct Bid {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub contractor_id: Uuid,
    pub price: Decimal,
    pub delivery_time: DateTime<Utc>,
    pub comments: Option<String>,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn is_pending(&self) -> bool {
        self.status == BidStatus::Pending
    }
}

/// Data for inserting a bid; new bids always start `pending`
#[derive(Debug, Clone)]
pub struct NewBid {
    pub tender_id: Uuid,
    pub contractor_id: Uuid,
    pub price: Decimal,
    pub delivery_time: DateTime<Utc>,
    pub comments: Option<String>,
}
