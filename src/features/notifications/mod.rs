//! Award notifications: stored records, the delivery queue and live sockets.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | GET | `/api/notifications` | Any | Own notifications |
//! | GET | `/api/notifications/ws` | Token in query or header | Live push socket |
//!
//! ## Delivery
//!
//! `NotificationService::notify` stores a record and publishes it to the queue.
//! `NotificationRelay` consumes the queue, marks each record delivered once and
//! pushes it through the `ConnectionRegistry` when the user is online. Records
//! left undelivered are re-published when their user connects.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod repository;
pub mod routes;
pub mod services;
pub mod workers;

pub use registry::{ConnectionRegistry, SendOutcome};
pub use repository::{NotificationRepository, PgNotificationRepository};
pub use services::NotificationService;
pub use workers::NotificationRelay;
