use axum::{extract::State, Json};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::AppPath;
use crate::features::auth::guards::RequireContractor;
use crate::features::rate_limits::dtos::BidRateLimitStatusDto;
use crate::features::rate_limits::BidRateLimitState;
use crate::shared::constants::bid_rate_limit_key;
use crate::shared::types::ApiResponse;

/// Get the caller's remaining bid quota for a tender
#[utoipa::path(
    get,
    path = "/api/tenders/{tender_id}/bids/rate-limit",
    params(
        ("tender_id" = Uuid, Path, description = "Tender ID")
    ),
    responses(
        (status = 200, description = "Current bid quota", body = ApiResponse<BidRateLimitStatusDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Contractor access required")
    ),
    tag = "rate-limits",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_bid_rate_limit_status(
    RequireContractor(user): RequireContractor,
    State(state): State<BidRateLimitState>,
    AppPath(tender_id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<BidRateLimitStatusDto>>> {
    let key = bid_rate_limit_key(user.user_id, tender_id);
    let status = state
        .limiter
        .status(&key, state.max_requests, state.window)?;

    Ok(Json(ApiResponse::success(
        Some(BidRateLimitStatusDto {
            used: status.used,
            remaining: status.remaining,
            max_requests: state.max_requests,
            window_secs: state.window.as_secs(),
        }),
        None,
        None,
    )))
}
