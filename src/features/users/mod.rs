//! User accounts.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/users/me` | Own profile |
//! | PUT | `/api/users/me` | Update name and/or email |
//! | DELETE | `/api/users/me` | Delete own account |
//! | GET | `/api/users/{id}` | Public profile of another user |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

pub use repository::{PgUserRepository, UserRepository};
pub use services::UserService;
