use axum::{routing::get, Router};

use crate::features::rate_limits::handlers;
use crate::features::rate_limits::BidRateLimitState;

/// Protected rate limit routes (require JWT authentication)
pub fn routes(state: BidRateLimitState) -> Router {
    Router::new()
        .route(
            "/api/tenders/{tender_id}/bids/rate-limit",
            get(handlers::get_bid_rate_limit_status),
        )
        .with_state(state)
}
