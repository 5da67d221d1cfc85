//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with helpers for the SSE handshake and the message sink.
//! The event stream is drained by a background task into a channel so tests
//! can await frames with timeouts.

use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;

const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestClient {
    pub client: reqwest::Client,
    pub base_url: String,
}

/// One parsed SSE frame.
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// A live event-stream connection.
pub struct SseConnection {
    events: mpsc::UnboundedReceiver<SseEvent>,
    /// The POST URL announced by the `endpoint` event.
    pub endpoint: String,
    _reader: tokio::task::JoinHandle<()>,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build reqwest client");
        Self { client, base_url }
    }

    /// Open the event stream at the default path and consume the `endpoint`
    /// bootstrap event.
    pub async fn open_sse(&self) -> SseConnection {
        self.open_sse_at("/sse").await
    }

    pub async fn open_sse_at(&self, path: &str) -> SseConnection {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("SSE request failed");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false));

        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(chunk) = stream.next().await {
                let Ok(chunk) = chunk else { break };
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(pos) = buffer.find("\n\n") {
                    let frame = buffer[..pos].to_string();
                    buffer.drain(..pos + 2);
                    if let Some(event) = parse_sse_frame(&frame) {
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        let mut connection = SseConnection {
            events: rx,
            endpoint: String::new(),
            _reader: reader,
        };

        let bootstrap = connection.next_event().await;
        assert_eq!(bootstrap.event, "endpoint");
        connection.endpoint = bootstrap.data;
        connection
    }

    /// POST a JSON-RPC body to an endpoint path (as announced over SSE).
    pub async fn post_message(&self, endpoint: &str, body: &str) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, endpoint))
            .header("content-type", "application/json")
            .body(body.to_string())
            .timeout(EVENT_TIMEOUT)
            .send()
            .await
            .expect("POST failed")
    }
}

impl SseConnection {
    /// The session id embedded in the endpoint URL.
    pub fn session_id(&self) -> String {
        self.endpoint
            .split("session_id=")
            .nth(1)
            .expect("endpoint URL carries no session id")
            .to_string()
    }

    /// Await the next frame, panicking after a generous timeout.
    pub async fn next_event(&mut self) -> SseEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for SSE event")
            .expect("event stream closed")
    }

    /// Await the next `message` frame and parse its JSON payload.
    pub async fn next_response(&mut self) -> Value {
        let event = self.next_event().await;
        assert_eq!(event.event, "message");
        serde_json::from_str(&event.data).expect("message frame is not JSON")
    }

    /// Assert that no frame arrives within the window.
    pub async fn expect_no_event(&mut self, window: Duration) {
        let result = tokio::time::timeout(window, self.events.recv()).await;
        assert!(
            result.is_err(),
            "expected silence, got frame: {:?}",
            result.unwrap()
        );
    }
}

fn parse_sse_frame(frame: &str) -> Option<SseEvent> {
    let mut event = String::from("message");
    let mut data_lines = Vec::new();

    for line in frame.lines() {
        if line.starts_with(':') {
            // Comment (keep-alive); ignored.
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event,
        data: data_lines.join("\n"),
    })
}
