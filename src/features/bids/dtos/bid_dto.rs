use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::bids::models::{Bid, BidStatus};

/// Request DTO for placing a bid
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBidDto {
    /// Must be greater than zero
    #[schema(value_type = String, example = "12500.00")]
    pub price: Decimal,

    /// Promised delivery, must be in the future
    pub delivery_time: DateTime<Utc>,

    #[validate(length(max = 5000, message = "Comments are too long"))]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BidResponseDto {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub contractor_id: Uuid,
    #[schema(value_type = String, example = "12500.00")]
    pub price: Decimal,
    pub delivery_time: DateTime<Utc>,
    pub comments: Option<String>,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Bid> for BidResponseDto {
    fn from(b: Bid) -> Self {
        Self {
            id: b.id,
            tender_id: b.tender_id,
            contractor_id: b.contractor_id,
            price: b.price,
            delivery_time: b.delivery_time,
            comments: b.comments,
            status: b.status,
            created_at: b.created_at,
        }
    }
}
