pub mod config;
mod http_layers;
pub mod session;
pub mod sse;
pub mod state;
pub mod stdio;

pub use config::ServerConfig;
pub use sse::{make_app, run_sse_server};
pub use stdio::run_stdio_server;
