//! Role-based authorization guards.
//!
//! These guards extract the authenticated user and verify the marketplace role:
//! - client: posts tenders and awards bids
//! - contractor: bids on open tenders

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use axum::{extract::FromRequestParts, http::request::Parts};

fn authenticated(parts: &Parts) -> Result<AuthenticatedUser, AppError> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))
}

/// Guard for client-only operations (tender management, awarding).
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireClient(user): RequireClient) { ... }
/// ```
pub struct RequireClient(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireClient
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        if !user.is_client() {
            return Err(AppError::Forbidden("Client access required".to_string()));
        }

        Ok(RequireClient(user))
    }
}

/// Guard for contractor-only operations (placing and withdrawing bids).
pub struct RequireContractor(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireContractor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        if !user.is_contractor() {
            return Err(AppError::Forbidden(
                "Contractor access required".to_string(),
            ));
        }

        Ok(RequireContractor(user))
    }
}
