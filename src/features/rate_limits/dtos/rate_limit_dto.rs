use serde::Serialize;
use utoipa::ToSchema;

/// Response DTO for a contractor's bid quota on one tender
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BidRateLimitStatusDto {
    /// Bids counted in the current window
    pub used: usize,
    /// Bids that can still be placed before the window fills
    pub remaining: usize,
    pub max_requests: usize,
    pub window_secs: u64,
}
