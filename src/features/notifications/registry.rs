//! Live WebSocket connections, one per user.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    RecipientOffline,
}

/// Identifies one registration so a stale socket cannot remove its replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub user_id: Uuid,
    connection_id: u64,
}

struct Connection {
    id: u64,
    sender: UnboundedSender<String>,
}

/// Maps a user to the outbound channel of their socket. Last registration wins.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<Uuid, Connection>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id`, replacing any previous one.
    ///
    /// Dropping the previous sender closes its receiver, which ends that
    /// socket's writer.
    pub fn register(&self, user_id: Uuid) -> (ConnectionHandle, UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let replaced = self
            .connections
            .write()
            .insert(user_id, Connection { id, sender })
            .is_some();

        if replaced {
            tracing::debug!("Replaced existing connection for user {}", user_id);
        }

        (
            ConnectionHandle {
                user_id,
                connection_id: id,
            },
            receiver,
        )
    }

    /// Remove the registration if it is still the current one for its user
    pub fn unregister(&self, handle: &ConnectionHandle) -> bool {
        let mut connections = self.connections.write();
        match connections.get(&handle.user_id) {
            Some(current) if current.id == handle.connection_id => {
                connections.remove(&handle.user_id);
                true
            }
            _ => false,
        }
    }

    pub fn send(&self, user_id: Uuid, payload: String) -> SendOutcome {
        let failed_id = {
            let connections = self.connections.read();
            let Some(connection) = connections.get(&user_id) else {
                return SendOutcome::RecipientOffline;
            };
            match connection.sender.send(payload) {
                Ok(()) => return SendOutcome::Delivered,
                Err(_) => connection.id,
            }
        };

        // Receiver is gone; drop the entry unless a new socket already took its place
        let mut connections = self.connections.write();
        if connections
            .get(&user_id)
            .is_some_and(|current| current.id == failed_id)
        {
            connections.remove(&user_id);
        }
        SendOutcome::RecipientOffline
    }

    #[cfg(test)]
    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.connections.read().contains_key(&user_id)
    }

    pub fn online_count(&self) -> usize {
        self.connections.read().len()
    }
}
