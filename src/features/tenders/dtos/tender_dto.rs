use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::tenders::models::{Tender, TenderStatus};

/// Request DTO for posting a tender
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTenderDto {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[validate(length(max = 10000, message = "Description is too long"))]
    #[serde(default)]
    pub description: String,

    /// Must be in the future
    pub deadline: DateTime<Utc>,

    /// Must be greater than zero
    #[schema(value_type = String, example = "15000.00")]
    pub budget: Decimal,
}

/// Request DTO for updating an open tender; omitted fields are unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTenderDto {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 10000, message = "Description is too long"))]
    pub description: Option<String>,

    pub deadline: Option<DateTime<Utc>>,

    #[schema(value_type = Option<String>)]
    pub budget: Option<Decimal>,

    /// `open`, `closed` or `pending`; tenders are awarded through the award endpoint
    pub status: Option<TenderStatus>,
}

/// Request DTO for awarding a tender
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AwardTenderDto {
    pub bid_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenderResponseDto {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    #[schema(value_type = String, example = "15000.00")]
    pub budget: Decimal,
    pub status: TenderStatus,
    pub awarded_bid_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tender> for TenderResponseDto {
    fn from(t: Tender) -> Self {
        Self {
            id: t.id,
            client_id: t.client_id,
            title: t.title,
            description: t.description,
            deadline: t.deadline,
            budget: t.budget,
            status: t.status,
            awarded_bid_id: t.awarded_bid_id,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}
