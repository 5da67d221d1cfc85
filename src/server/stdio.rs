//! Stdio transport.
//!
//! One JSON-RPC message per line on stdin, one response per line on stdout.
//! All logging goes to stderr so the output stream stays clean. Requests are
//! processed sequentially; there is no pipelining.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::mcp::protocol::McpRequest;
use crate::mcp::Dispatcher;

pub async fn run_stdio_server(dispatcher: Dispatcher) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    run_stdio_loop(&dispatcher, stdin, stdout).await
}

/// The transport loop, generic over the streams for testability.
async fn run_stdio_loop<R, W>(dispatcher: &Dispatcher, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let cancel = CancellationToken::new();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: McpRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid JSON on stdin: {}", e);
                continue;
            }
        };

        debug!("Stdio request: {}", request.method);

        if let Some(response) = dispatcher.dispatch(request, &cancel).await {
            let mut json = serde_json::to_string(&response)?;
            json.push('\n');
            writer.write_all(json.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    info!("Input stream closed, exiting");
    Ok(())
}
