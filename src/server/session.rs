//! SSE session manager.
//!
//! Tracks all live event-stream connections by session id. Each session owns
//! a bounded outbound queue of JSON-RPC responses and a cancellation token
//! that fans out into the session's in-flight tool calls on disconnect.

use std::collections::HashMap;
use std::time::Duration;

use rand::RngCore;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::mcp::protocol::McpResponse;

/// Bound of the per-session outbound queue.
const OUTBOUND_QUEUE_SIZE: usize = 32;

/// How long an enqueue may block before the frame is dropped, preserving the
/// producer's liveness against a stalled consumer.
const ENQUEUE_TIMEOUT: Duration = Duration::from_millis(100);

struct SessionEntry {
    sender: mpsc::Sender<McpResponse>,
    cancellation: CancellationToken,
}

/// Error type for send operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SendError {
    /// No session with that id is registered.
    UnknownSession,
    /// The enqueue did not complete in time or the consumer is gone; the
    /// frame was dropped.
    Dropped,
}

/// A freshly registered session, handed to the event-stream writer.
pub struct RegisteredSession {
    pub id: String,
    pub cancellation: CancellationToken,
    pub receiver: mpsc::Receiver<McpResponse>,
}

/// Manages all active SSE sessions.
///
/// Producers (POST workers) enqueue under the read lock; registration and
/// removal take the write lock. Removal happens before the receiver is
/// dropped, so nothing is ever enqueued on a closed channel of a session
/// that is still listed.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new session under a fresh 128-bit random id.
    pub async fn register(&self) -> RegisteredSession {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_SIZE);
        let id = new_session_id();
        let cancellation = CancellationToken::new();

        let mut sessions = self.sessions.write().await;
        sessions.insert(
            id.clone(),
            SessionEntry {
                sender: tx,
                cancellation: cancellation.clone(),
            },
        );
        debug!("SSE session {} registered, total {}", id, sessions.len());

        RegisteredSession {
            id,
            cancellation,
            receiver: rx,
        }
    }

    /// Remove a session and cancel its in-flight work.
    pub async fn unregister(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.remove(session_id) {
            entry.cancellation.cancel();
            debug!(
                "SSE session {} removed, total {}",
                session_id,
                sessions.len()
            );
        }
    }

    /// The cancellation scope of a session, if it is registered. POST
    /// handlers use this both as the existence check and as the parent scope
    /// for the dispatched call.
    pub async fn cancellation(&self, session_id: &str) -> Option<CancellationToken> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|entry| entry.cancellation.clone())
    }

    /// Enqueue a response on the owning session's queue.
    ///
    /// The read lock is held across the bounded enqueue, so a session that is
    /// being unregistered can never be written to after removal.
    pub async fn send_to(&self, session_id: &str, response: McpResponse) -> Result<(), SendError> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(session_id).ok_or(SendError::UnknownSession)?;
        entry
            .sender
            .send_timeout(response, ENQUEUE_TIMEOUT)
            .await
            .map_err(|_| SendError::Dropped)
    }

    #[allow(dead_code)] // Useful for tests/debugging
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }
}

fn new_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{:032x}", u128::from_be_bytes(bytes))
}
