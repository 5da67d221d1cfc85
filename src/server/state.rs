use std::sync::Arc;

use axum::extract::FromRef;

use super::session::SessionManager;
use crate::mcp::Dispatcher;

#[derive(Clone)]
pub struct ServerState {
    pub dispatcher: Arc<Dispatcher>,
    pub sessions: Arc<SessionManager>,
}

impl FromRef<ServerState> for Arc<Dispatcher> {
    fn from_ref(input: &ServerState) -> Self {
        input.dispatcher.clone()
    }
}

impl FromRef<ServerState> for Arc<SessionManager> {
    fn from_ref(input: &ServerState) -> Self {
        input.sessions.clone()
    }
}
