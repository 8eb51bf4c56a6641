use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppPath};
use crate::features::auth::guards::RequireClient;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::tenders::dtos::{
    AwardTenderDto, CreateTenderDto, TenderResponseDto, UpdateTenderDto,
};
use crate::features::tenders::services::TenderService;
use crate::shared::types::ApiResponse;

/// Post a new tender
#[utoipa::path(
    post,
    path = "/api/tenders",
    request_body = CreateTenderDto,
    responses(
        (status = 201, description = "Tender created", body = ApiResponse<TenderResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Client access required")
    ),
    tag = "tenders",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_tender(
    RequireClient(user): RequireClient,
    State(service): State<Arc<TenderService>>,
    AppJson(dto): AppJson<CreateTenderDto>,
) -> Result<(StatusCode, Json<ApiResponse<TenderResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let tender = service.create(user.user_id, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(tender), None, None)),
    ))
}

/// List all tenders
#[utoipa::path(
    get,
    path = "/api/tenders",
    responses(
        (status = 200, description = "List of tenders", body = ApiResponse<Vec<TenderResponseDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "tenders",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_tenders(
    _user: AuthenticatedUser,
    State(service): State<Arc<TenderService>>,
) -> Result<Json<ApiResponse<Vec<TenderResponseDto>>>> {
    let tenders = service.list().await?;
    Ok(Json(ApiResponse::<TenderResponseDto>::list(tenders)))
}

/// Get a tender by ID
#[utoipa::path(
    get,
    path = "/api/tenders/{tender_id}",
    params(
        ("tender_id" = Uuid, Path, description = "Tender ID")
    ),
    responses(
        (status = 200, description = "Tender found", body = ApiResponse<TenderResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Tender not found")
    ),
    tag = "tenders",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_tender(
    _user: AuthenticatedUser,
    State(service): State<Arc<TenderService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<TenderResponseDto>>> {
    let tender = service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(tender), None, None)))
}

/// Update an open tender
#[utoipa::path(
    put,
    path = "/api/tenders/{tender_id}",
    params(
        ("tender_id" = Uuid, Path, description = "Tender ID")
    ),
    request_body = UpdateTenderDto,
    responses(
        (status = 200, description = "Tender updated", body = ApiResponse<TenderResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Client access required"),
        (status = 404, description = "Tender not found or access denied"),
        (status = 409, description = "Tender is not open")
    ),
    tag = "tenders",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_tender(
    RequireClient(user): RequireClient,
    State(service): State<Arc<TenderService>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(dto): AppJson<UpdateTenderDto>,
) -> Result<Json<ApiResponse<TenderResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let tender = service.update(id, user.user_id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(tender),
        Some("Tender updated".to_string()),
        None,
    )))
}

/// Delete a tender
#[utoipa::path(
    delete,
    path = "/api/tenders/{tender_id}",
    params(
        ("tender_id" = Uuid, Path, description = "Tender ID")
    ),
    responses(
        (status = 200, description = "Tender deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Client access required"),
        (status = 404, description = "Tender not found or access denied")
    ),
    tag = "tenders",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_tender(
    RequireClient(user): RequireClient,
    State(service): State<Arc<TenderService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id, user.user_id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Tender deleted".to_string()),
        None,
    )))
}

/// Award a tender to one of its bids
///
/// The winning bid is accepted, every other bid is rejected, and the configured
/// recipients are notified once the award is stored.
#[utoipa::path(
    post,
    path = "/api/tenders/{tender_id}/award",
    params(
        ("tender_id" = Uuid, Path, description = "Tender ID")
    ),
    request_body = AwardTenderDto,
    responses(
        (status = 200, description = "Tender awarded", body = ApiResponse<TenderResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Client access required"),
        (status = 404, description = "Tender or bid not found"),
        (status = 409, description = "Tender is not open")
    ),
    tag = "tenders",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn award_tender(
    RequireClient(user): RequireClient,
    State(service): State<Arc<TenderService>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(dto): AppJson<AwardTenderDto>,
) -> Result<Json<ApiResponse<TenderResponseDto>>> {
    let tender = service.award(id, user.user_id, dto.bid_id).await?;
    Ok(Json(ApiResponse::success(
        Some(tender),
        Some("Tender awarded".to_string()),
        None,
    )))
}
