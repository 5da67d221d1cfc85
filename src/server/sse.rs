//! SSE transport routes.
//!
//! `GET <sse path>` opens the event stream: an `endpoint` event pointing the
//! client at the message sink, then one `message` event per JSON-RPC
//! response, with keep-alive comments in between. `POST /messages` accepts
//! one request per body, answers 202 and hands the work to a background
//! task; the eventual response travels back over the originating session's
//! stream only.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use futures::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::http_layers::log_requests;
use super::session::SessionManager;
use super::state::ServerState;
use super::ServerConfig;
use crate::mcp::protocol::{McpRequest, McpResponse};
use crate::mcp::Dispatcher;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Event stream for one session.
///
/// Yields the `endpoint` bootstrap event first, then forwards queued
/// responses. On drop (client disconnect, server shutdown) the session is
/// removed from the manager before the receiver, and with it the channel,
/// goes away.
struct SessionStream {
    sessions: Arc<SessionManager>,
    session_id: String,
    endpoint: Option<String>,
    receiver: Option<mpsc::Receiver<McpResponse>>,
}

impl Stream for SessionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(endpoint) = this.endpoint.take() {
            return Poll::Ready(Some(Ok(Event::default().event("endpoint").data(endpoint))));
        }

        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Ready(None);
        };

        match receiver.poll_recv(cx) {
            Poll::Ready(Some(response)) => match serde_json::to_string(&response) {
                Ok(json) => Poll::Ready(Some(Ok(Event::default().event("message").data(json)))),
                Err(e) => {
                    error!("Failed to serialize response frame: {}", e);
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            },
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        let sessions = self.sessions.clone();
        let session_id = std::mem::take(&mut self.session_id);
        let receiver = self.receiver.take();
        tokio::spawn(async move {
            // Deregister first; only then let the channel close.
            sessions.unregister(&session_id).await;
            drop(receiver);
            debug!("SSE session {} torn down", session_id);
        });
    }
}

async fn sse_handler(State(sessions): State<Arc<SessionManager>>) -> Response {
    let session = sessions.register().await;
    info!("SSE client connected, session {}", session.id);

    let endpoint = format!("/messages?session_id={}", session.id);
    let stream = SessionStream {
        sessions,
        session_id: session.id,
        endpoint: Some(endpoint),
        receiver: Some(session.receiver),
    };

    let mut response = Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(KEEPALIVE_INTERVAL)
                .text("keepalive"),
        )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );

    response
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(default)]
    session_id: Option<String>,
}

async fn message_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    State(sessions): State<Arc<SessionManager>>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "Missing session id").into_response();
    };

    let request: McpRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejecting unparseable POST body: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    let Some(session_cancel) = sessions.cancellation(&session_id).await else {
        return (StatusCode::NOT_FOUND, "Unknown session").into_response();
    };

    debug!("Session {} accepted request: {}", session_id, request.method);

    // Respond 202 immediately; the response reaches the client through its
    // event stream once the call completes.
    tokio::spawn(async move {
        if let Some(response) = dispatcher.dispatch(request, &session_cancel).await {
            if let Err(e) = sessions.send_to(&session_id, response).await {
                warn!("Dropped response for session {}: {:?}", session_id, e);
            }
        }
    });

    StatusCode::ACCEPTED.into_response()
}

pub fn make_app(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Router {
    let sse_path = config.sse_path();
    let state = ServerState {
        dispatcher,
        sessions: Arc::new(SessionManager::new()),
    };

    Router::new()
        .route(&sse_path, get(sse_handler))
        .route("/messages", post(message_handler))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run_sse_server(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let listen_addr = config.listen_addr();
    let app = make_app(config, dispatcher);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", listen_addr, e))?;

    info!("SSE server listening on {}", listen_addr);
    Ok(axum::serve(listener, app).await?)
}
