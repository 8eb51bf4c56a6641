use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::middleware::bearer_token;
use crate::features::auth::JwtValidator;
use crate::features::notifications::dtos::WsConnectQuery;
use crate::features::notifications::registry::ConnectionRegistry;
use crate::features::notifications::services::NotificationService;

#[derive(Clone)]
pub struct NotificationWsState {
    pub validator: Arc<JwtValidator>,
    pub registry: Arc<ConnectionRegistry>,
    pub service: Arc<NotificationService>,
}

/// Open the notification socket
///
/// The JWT comes from the `token` query parameter or the `Authorization`
/// header. Undelivered notifications are re-sent right after connecting.
#[utoipa::path(
    get,
    path = "/api/notifications/ws",
    params(
        ("token" = Option<String>, Query, description = "JWT, when the Authorization header cannot be set")
    ),
    responses(
        (status = 101, description = "Switching to WebSocket"),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "notifications"
)]
pub async fn notifications_ws(
    State(state): State<NotificationWsState>,
    Query(query): Query<WsConnectQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    let token = match query.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => bearer_token(&headers)?,
    };
    let user = state.validator.validate_token(token)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(state, user.user_id, socket)))
}

async fn handle_socket(state: NotificationWsState, user_id: Uuid, socket: WebSocket) {
    // Register before the backfill so re-enqueued messages find the socket
    let (handle, receiver) = state.registry.register(user_id);
    tracing::info!(
        "Notification socket opened for user {} ({} online)",
        user_id,
        state.registry.online_count()
    );

    if let Err(e) = state.service.republish_undelivered(user_id).await {
        tracing::warn!("Backfill failed for user {}: {}", user_id, e);
    }

    let (mut sink, mut incoming) = socket.split();
    let mut outgoing = UnboundedReceiverStream::new(receiver);

    let writer = async {
        while let Some(text) = outgoing.next().await {
            if let Err(e) = sink.send(Message::Text(text.into())).await {
                tracing::debug!("Notification socket write failed for {}: {}", user_id, e);
                break;
            }
        }
        let _ = sink.close().await;
    };

    let reader = async {
        while let Some(frame) = incoming.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    state.registry.unregister(&handle);
    tracing::info!("Notification socket closed for user {}", user_id);
}
