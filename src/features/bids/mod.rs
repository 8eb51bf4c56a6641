//! Bids placed by contractors on open tenders.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | POST | `/api/tenders/{tender_id}/bids` | Contractor | Place a bid (rate limited) |
//! | GET | `/api/tenders/{tender_id}/bids` | Any | Bids on a tender (cached) |
//! | GET | `/api/tenders/{tender_id}/bids/{bid_id}` | Any | One bid (cached) |
//! | GET | `/api/bids/mine` | Contractor | Own bids across tenders |
//! | DELETE | `/api/bids/{bid_id}` | Owner | Withdraw a pending bid |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

pub use repository::{BidRepository, PgBidRepository};
pub use services::BidService;
