//! RealtimeHub - WebSocket distribution
//!
//! ## Responsibilities
//!
//! - WebSocket connection management
//! - Console view broadcasting (every CheckInMachine transition)
//! - Camera status notifications
//!
//! Late joiners get the current view from the WebSocket handler, the hub
//! itself keeps no history.

use crate::checkin_machine::CheckInView;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Hub message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum HubMessage {
    /// Full console snapshot
    #[serde(rename = "checkin_update")]
    CheckInUpdate(CheckInView),
    CameraStatus(CameraStatusMessage),
}

impl HubMessage {
    fn kind(&self) -> &'static str {
        match self {
            HubMessage::CheckInUpdate(_) => "checkin_update",
            HubMessage::CameraStatus(_) => "camera_status",
        }
    }
}

/// Camera status message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraStatusMessage {
    pub running: bool,
    pub device_id: Option<String>,
    pub error: Option<String>,
}

/// Client connection
struct ClientConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
    connection_count: AtomicU64,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    /// Register a new client
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, ClientConnection { id, tx });
        }

        self.connection_count.fetch_add(1, Ordering::Relaxed);
        tracing::info!(connection_id = %id, "Client connected");

        (id, rx)
    }

    /// Unregister a client
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(connection_id = %id, "Client disconnected");
        }
    }

    /// Broadcast message to all clients
    pub async fn broadcast(&self, message: HubMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize message");
                return;
            }
        };

        let connections = self.connections.read().await;
        tracing::debug!(
            message_type = message.kind(),
            client_count = connections.len(),
            "Broadcasting message to clients"
        );

        for conn in connections.values() {
            if let Err(e) = conn.tx.send(json.clone()) {
                tracing::warn!(connection_id = %conn.id, error = %e, "Failed to send message");
            }
        }
    }

    /// Send message to one connection
    pub async fn send_to(&self, id: &Uuid, message: &HubMessage) {
        let json = match serde_json::to_string(message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize message");
                return;
            }
        };

        let connections = self.connections.read().await;
        if let Some(conn) = connections.get(id) {
            if let Err(e) = conn.tx.send(json) {
                tracing::warn!(connection_id = %conn.id, error = %e, "Failed to send message");
            }
        }
    }

    /// Drop every client channel; their sockets close once drained
    pub async fn close_all(&self) {
        let mut connections = self.connections.write().await;
        let closed = connections.len();
        connections.clear();
        self.connection_count.store(0, Ordering::Relaxed);
        tracing::info!(closed, "All clients disconnected");
    }

    /// Get connection count
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}
