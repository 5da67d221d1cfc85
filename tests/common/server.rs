//! Test server lifecycle management
//!
//! Spawns an isolated SSE server on a random port for each test. The full
//! tool catalog is registered; tests only exercise calls that do not need
//! root or network access.

use std::sync::Arc;

use mcp_netutil::server::{make_app, ServerConfig};
use mcp_netutil::tools::register_all_tools;
use mcp_netutil::{Dispatcher, NullRecordStore, RecordStore, SqliteRecordStore, ToolRegistry};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    // Private fields - keep resources alive until drop
    _temp_record_dir: Option<TempDir>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawn a server with the store disabled and no API key.
    pub async fn spawn() -> Self {
        Self::spawn_inner(None, false).await
    }

    /// Spawn a server with a temporary record store.
    pub async fn spawn_with_record_store() -> Self {
        Self::spawn_inner(None, true).await
    }

    /// Spawn a server whose SSE path carries the given API key.
    pub async fn spawn_with_api_key(key: &str) -> Self {
        Self::spawn_inner(Some(key.to_string()), false).await
    }

    async fn spawn_inner(api_key: Option<String>, with_store: bool) -> Self {
        let (temp_record_dir, record_store): (Option<TempDir>, Arc<dyn RecordStore>) =
            if with_store {
                let dir = TempDir::new().expect("Failed to create temp record dir");
                let store =
                    SqliteRecordStore::new(dir.path()).expect("Failed to open record store");
                (Some(dir), Arc::new(store))
            } else {
                (None, Arc::new(NullRecordStore))
            };

        let mut registry = ToolRegistry::new();
        register_all_tools(&mut registry);
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), record_store));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            bind_addr: "127.0.0.1".to_string(),
            port,
            api_key,
        };
        let app = make_app(config, dispatcher);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        Self {
            base_url,
            _temp_record_dir: temp_record_dir,
            _shutdown_tx: Some(shutdown_tx),
        }
    }
}
