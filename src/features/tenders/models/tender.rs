use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Tender lifecycle, mirrors the `tender_status` Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tender_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenderStatus {
    Open,
    Closed,
    Pending,
    Awarded,
}

/// Database model for a tender
#[derive(Debug, Clone, FromRow)]
pub struct Tender {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub budget: Decimal,
    pub status: TenderStatus,
    pub awarded_bid_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tender {
    pub fn is_open(&self) -> bool {
        self.status == TenderStatus::Open
    }

    /// Open and before its deadline
    pub fn accepts_bids(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.deadline > now
    }
}

/// Data for inserting a tender
#[derive(Debug, Clone)]
pub struct NewTender {
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub budget: Decimal,
}

/// Partial tender update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct TenderChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub budget: Option<Decimal>,
    pub status: Option<TenderStatus>,
}
