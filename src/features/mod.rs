pub mod auth;
pub mod bids;
pub mod notifications;
pub mod rate_limits;
pub mod tenders;
pub mod users;
