//! Modules layer - Infrastructure components for external integrations
//!
//! Contains clients and adapters for the Redis cache and the RabbitMQ queue.

pub mod cache;
pub mod queue;
