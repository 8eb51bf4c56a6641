use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::notifications::handlers::{self, NotificationWsState};
use crate::features::notifications::services::NotificationService;

/// Protected notification routes (require JWT authentication)
pub fn routes(service: Arc<NotificationService>) -> Router {
    Router::new()
        .route("/api/notifications", get(handlers::list_notifications))
        .with_state(service)
}

/// WebSocket route; authenticates itself since browsers pass the token in the query
pub fn ws_routes(state: NotificationWsState) -> Router {
    Router::new()
        .route("/api/notifications/ws", get(handlers::notifications_ws))
        .with_state(state)
}
