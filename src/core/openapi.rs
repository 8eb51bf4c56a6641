use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth;
use crate::features::bids::{dtos as bids_dtos, handlers as bids_handlers, models as bids_models};
use crate::features::notifications::{dtos as notifications_dtos, handlers as notifications_handlers};
use crate::features::rate_limits::{dtos as rate_limits_dtos, handlers as rate_limits_handlers};
use crate::features::tenders::{
    dtos as tenders_dtos, handlers as tenders_handlers, models as tenders_models,
};
use crate::features::users::{dtos as users_dtos, handlers as users_handlers, models as users_models};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth (public)
        auth::handlers::register,
        auth::handlers::login,
        // Users
        users_handlers::get_me,
        users_handlers::update_me,
        users_handlers::delete_me,
        users_handlers::get_user,
        // Tenders
        tenders_handlers::create_tender,
        tenders_handlers::list_tenders,
        tenders_handlers::get_tender,
        tenders_handlers::update_tender,
        tenders_handlers::delete_tender,
        tenders_handlers::award_tender,
        // Bids
        bids_handlers::create_bid,
        bids_handlers::list_bids,
        bids_handlers::get_bid,
        bids_handlers::list_my_bids,
        bids_handlers::delete_bid,
        // Rate Limits
        rate_limits_handlers::get_bid_rate_limit_status,
        // Notifications
        notifications_handlers::list_notifications,
        notifications_handlers::notifications_ws,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Auth
            auth::dtos::RegisterRequestDto,
            auth::dtos::LoginRequestDto,
            auth::dtos::AuthResponseDto,
            ApiResponse<auth::dtos::AuthResponseDto>,
            // Users
            users_models::UserRole,
            users_dtos::UserResponseDto,
            users_dtos::PublicUserDto,
            users_dtos::UpdateUserDto,
            ApiResponse<users_dtos::UserResponseDto>,
            ApiResponse<users_dtos::PublicUserDto>,
            // Tenders
            tenders_models::TenderStatus,
            tenders_dtos::CreateTenderDto,
            tenders_dtos::UpdateTenderDto,
            tenders_dtos::AwardTenderDto,
            tenders_dtos::TenderResponseDto,
            ApiResponse<tenders_dtos::TenderResponseDto>,
            ApiResponse<Vec<tenders_dtos::TenderResponseDto>>,
            // Bids
            bids_models::BidStatus,
            bids_dtos::CreateBidDto,
            bids_dtos::BidResponseDto,
            ApiResponse<bids_dtos::BidResponseDto>,
            ApiResponse<Vec<bids_dtos::BidResponseDto>>,
            // Rate Limits
            rate_limits_dtos::BidRateLimitStatusDto,
            ApiResponse<rate_limits_dtos::BidRateLimitStatusDto>,
            // Notifications
            notifications_dtos::NotificationResponseDto,
            notifications_dtos::NotificationPushDto,
            ApiResponse<Vec<notifications_dtos::NotificationResponseDto>>,
        )
    ),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "User profiles"),
        (name = "tenders", description = "Tenders posted by clients"),
        (name = "bids", description = "Bids placed by contractors"),
        (name = "rate-limits", description = "Bid submission quota"),
        (name = "notifications", description = "Award notifications and live push socket"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Tender Marketplace API",
        version = "0.1.0",
        description = "API documentation for the tender marketplace",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
