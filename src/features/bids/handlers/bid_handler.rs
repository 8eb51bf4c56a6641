use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppPath};
use crate::features::auth::guards::RequireContractor;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::bids::dtos::{BidResponseDto, CreateBidDto};
use crate::features::bids::services::BidService;
use crate::shared::types::ApiResponse;

/// Place a bid on an open tender
///
/// Limited per contractor and tender; over the limit the request is answered
/// with 429 and a `Retry-After` header before anything is stored.
#[utoipa::path(
    post,
    path = "/api/tenders/{tender_id}/bids",
    params(
        ("tender_id" = Uuid, Path, description = "Tender ID")
    ),
    request_body = CreateBidDto,
    responses(
        (status = 201, description = "Bid placed", body = ApiResponse<BidResponseDto>),
        (status = 400, description = "Validation error or tender closed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Contractor access required"),
        (status = 404, description = "Tender not found"),
        (status = 429, description = "Too many bids, see Retry-After")
    ),
    tag = "bids",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_bid(
    RequireContractor(user): RequireContractor,
    State(service): State<Arc<BidService>>,
    AppPath(tender_id): AppPath<Uuid>,
    AppJson(dto): AppJson<CreateBidDto>,
) -> Result<(StatusCode, Json<ApiResponse<BidResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let bid = service.create(tender_id, user.user_id, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(bid), None, None)),
    ))
}

/// List bids on a tender
#[utoipa::path(
    get,
    path = "/api/tenders/{tender_id}/bids",
    params(
        ("tender_id" = Uuid, Path, description = "Tender ID")
    ),
    responses(
        (status = 200, description = "Bids on the tender", body = ApiResponse<Vec<BidResponseDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Tender not found")
    ),
    tag = "bids",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_bids(
    _user: AuthenticatedUser,
    State(service): State<Arc<BidService>>,
    AppPath(tender_id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<Vec<BidResponseDto>>>> {
    let bids = service.list(tender_id).await?;
    Ok(Json(ApiResponse::<BidResponseDto>::list(bids)))
}

#[utoipa::path(
    get,
    path = "/api/tenders/{tender_id}/bids/{bid_id}",
    params(
        ("tender_id" = Uuid, Path, description = "Tender ID"),
        ("bid_id" = Uuid, Path, description = "Bid ID")
    ),
    responses(
        (status = 200, description = "Bid found", body = ApiResponse<BidResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Bid not found")
    ),
    tag = "bids",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_bid(
    _user: AuthenticatedUser,
    State(service): State<Arc<BidService>>,
    AppPath((tender_id, bid_id)): AppPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<BidResponseDto>>> {
    let bid = service.get(tender_id, bid_id).await?;
    Ok(Json(ApiResponse::success(Some(bid), None, None)))
}

/// List the caller's own bids
#[utoipa::path(
    get,
    path = "/api/bids/mine",
    responses(
        (status = 200, description = "Own bids", body = ApiResponse<Vec<BidResponseDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Contractor access required")
    ),
    tag = "bids",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_my_bids(
    RequireContractor(user): RequireContractor,
    State(service): State<Arc<BidService>>,
) -> Result<Json<ApiResponse<Vec<BidResponseDto>>>> {
    let bids = service.mine(user.user_id).await?;
    Ok(Json(ApiResponse::<BidResponseDto>::list(bids)))
}

/// Withdraw a pending bid
#[utoipa::path(
    delete,
    path = "/api/bids/{bid_id}",
    params(
        ("bid_id" = Uuid, Path, description = "Bid ID")
    ),
    responses(
        (status = 200, description = "Bid withdrawn"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Contractor access required"),
        (status = 404, description = "Bid not found or access denied"),
        (status = 409, description = "Bid already accepted or rejected")
    ),
    tag = "bids",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_bid(
    RequireContractor(user): RequireContractor,
    State(service): State<Arc<BidService>>,
    AppPath(bid_id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(bid_id, user.user_id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Bid withdrawn".to_string()),
        None,
    )))
}
