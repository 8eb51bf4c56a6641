//! Sliding-window rate limiting for bid submission.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | GET | `/api/tenders/{tender_id}/bids/rate-limit` | Contractor | Current bid quota for a tender |
//!
//! `POST /api/tenders/{tender_id}/bids` is wrapped by [`middleware::bid_rate_limit`].

pub mod dtos;
pub mod handlers;
pub mod limiter;
pub mod middleware;
pub mod routes;
pub mod workers;

pub use limiter::{RateDecision, RateLimitError, SlidingWindowLimiter};
pub use middleware::BidRateLimitState;
pub use workers::RateLimitSweeper;
