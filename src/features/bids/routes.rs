use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};

use crate::features::bids::handlers;
use crate::features::bids::services::BidService;
use crate::features::rate_limits::middleware::bid_rate_limit;
use crate::features::rate_limits::BidRateLimitState;

/// Protected bid routes (require JWT authentication)
///
/// Only bid creation sits behind the rate limiter; `route_layer` wraps the
/// methods registered before it.
pub fn routes(service: Arc<BidService>, rate_limit: BidRateLimitState) -> Router {
    Router::new()
        .route(
            "/api/tenders/{tender_id}/bids",
            post(handlers::create_bid)
                .route_layer(from_fn_with_state(rate_limit, bid_rate_limit))
                .get(handlers::list_bids),
        )
        .route(
            "/api/tenders/{tender_id}/bids/{bid_id}",
            get(handlers::get_bid),
        )
        .route("/api/bids/mine", get(handlers::list_my_bids))
        .route("/api/bids/{bid_id}", delete(handlers::delete_bid))
        .with_state(service)
}
