//! Registration, login and bearer-token authentication.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | POST | `/api/auth/register` | No | Create an account and get a token |
//! | POST | `/api/auth/login` | No | Exchange credentials for a token |

mod password;
mod validator;

pub mod dtos;
pub mod guards;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod services;

pub use password::PasswordHasher;
pub use services::AuthService;
pub use validator::JwtValidator;
