//! Tenders posted by clients, and awarding them to a bid.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | POST | `/api/tenders` | Client | Create a tender (starts `open`) |
//! | GET | `/api/tenders` | Any | List tenders (cached) |
//! | GET | `/api/tenders/{tender_id}` | Any | Get a tender (cached) |
//! | PUT | `/api/tenders/{tender_id}` | Owner | Update while `open` |
//! | DELETE | `/api/tenders/{tender_id}` | Owner | Delete a tender and its bids |
//! | POST | `/api/tenders/{tender_id}/award` | Owner | Award a bid and notify |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

pub use repository::{PgTenderRepository, TenderRepository};
pub use services::TenderService;
