//! Registry of live chat sessions.
//!
//! Each WebSocket connection registers one session identified by a fresh
//! UUID and owns the receiving half of a bounded channel. Delivery reports
//! success, so callers can stop producing the moment a client disappears.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::protocol::ServerMessage;

const CHANNEL_CAPACITY: usize = 64;

pub type SessionId = Uuid;

/// Shared map of session id to outbound message channel.
#[derive(Debug, Default, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, mpsc::Sender<ServerMessage>>>>,
}

impl SessionManager {
    /// Register a new session and hand back its outbound receiver.
    pub async fn register(&self) -> (SessionId, mpsc::Receiver<ServerMessage>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.sessions.write().await.insert(session_id, tx);
        debug!(%session_id, "session registered");
        (session_id, rx)
    }

    /// Drop a session. Unknown ids are ignored.
    pub async fn remove(&self, session_id: &SessionId) {
        if self.sessions.write().await.remove(session_id).is_some() {
            debug!(%session_id, "session removed");
        }
    }

    /// Deliver a message to one session.
    ///
    /// Returns `false` when the session is unknown or its receiver is
    /// gone; the caller should treat that as a disconnect and stop.
    pub async fn send(&self, session_id: &SessionId, message: ServerMessage) -> bool {
        let tx = {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                Some(tx) => tx.clone(),
                None => return false,
            }
        };
        tx.send(message).await.is_ok()
    }

    /// Number of currently registered sessions.
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
