// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Client role - posts tenders and awards bids
pub const ROLE_CLIENT: &str = "client";

/// Contractor role - submits bids on open tenders
pub const ROLE_CONTRACTOR: &str = "contractor";

// =============================================================================
// CACHE KEYS
// =============================================================================

/// Cached listing of all tenders
pub const TENDERS_CACHE_KEY: &str = "tenders:all";

pub fn tender_cache_key(tender_id: uuid::Uuid) -> String {
    format!("tenders:{}", tender_id)
}

pub fn tender_bids_cache_key(tender_id: uuid::Uuid) -> String {
    format!("bids:tender:{}", tender_id)
}

pub fn bid_cache_key(tender_id: uuid::Uuid, bid_id: uuid::Uuid) -> String {
    format!("bids:tender:{}:bid:{}", tender_id, bid_id)
}

// =============================================================================
// RATE LIMIT KEYS
// =============================================================================

/// Bid submissions are limited per contractor per tender
pub fn bid_rate_limit_key(contractor_id: uuid::Uuid, tender_id: uuid::Uuid) -> String {
    format!("bid:{}:{}", contractor_id, tender_id)
}
