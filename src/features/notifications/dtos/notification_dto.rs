use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::notifications::models::Notification;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponseDto {
    pub id: Uuid,
    pub message: String,
    pub is_delivered: bool,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<Notification> for NotificationResponseDto {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            message: n.message,
            is_delivered: n.is_delivered,
            created_at: n.created_at,
            delivered_at: n.delivered_at,
        }
    }
}

/// Frame pushed to a connected WebSocket client
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationPushDto {
    pub id: Uuid,
    pub message: String,
}

/// Query for the WebSocket endpoint; browsers cannot set headers on upgrade
#[derive(Debug, Clone, Deserialize)]
pub struct WsConnectQuery {
    pub token: Option<String>,
}
