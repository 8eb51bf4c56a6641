use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::core::extractor::AppPath;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::rate_limits::{RateDecision, SlidingWindowLimiter};
use crate::shared::constants::bid_rate_limit_key;

/// Limiter handle plus the limits applied to bid submission
#[derive(Clone)]
pub struct BidRateLimitState {
    pub limiter: Arc<SlidingWindowLimiter>,
    pub max_requests: usize,
    pub window: Duration,
}

/// Gate `POST /api/tenders/{tender_id}/bids` per contractor and tender.
///
/// Runs after authentication and before the handler, so a denied request never
/// reaches the database.
pub async fn bid_rate_limit(
    State(state): State<BidRateLimitState>,
    AppPath(tender_id): AppPath<Uuid>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = req
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.user_id)
        .ok_or_else(|| AppError::Forbidden("Authenticated user required".to_string()))?;

    let key = bid_rate_limit_key(user_id, tender_id);

    match state.limiter.check(&key, state.max_requests, state.window)? {
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(req).await;
            response
                .headers_mut()
                .insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            Ok(response)
        }
        RateDecision::Denied { retry_after } => {
            let retry_after_secs = ceil_secs(retry_after);
            tracing::warn!(
                "Bid rate limit exceeded: contractor={}, tender={}, retry_after={}s",
                user_id,
                tender_id,
                retry_after_secs
            );
            Err(AppError::RateLimitExceeded {
                message: format!(
                    "Too many bids for this tender, try again in {} seconds",
                    retry_after_secs
                ),
                retry_after_secs,
            })
        }
    }
}

/// Whole seconds, rounded up and never zero
fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}
