//! Port Status Tool
//!
//! Parses `ss -tulnpH` into structured listener entries.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{McpError, ToolsCallResult};
use crate::mcp::registry::{RegisteredTool, ToolBuilder, ToolRegistry, ToolResult};
use crate::runner::run_command;

use super::optional_int_arg;

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(port_status_tool());
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortStatus {
    pub port: u16,
    pub protocol: String,
    pub state: String,
    /// e.g. "nginx (pid=1234)"
    pub process: String,
}

fn port_status_tool() -> RegisteredTool {
    ToolBuilder::new("port_status")
        .description("Check status of ports")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "port": { "type": "integer", "description": "Specific port to check (optional, 0 for all)" }
            }
        }))
        .build(port_status_handler)
}

async fn port_status_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let port = match optional_int_arg(&args, "port") {
        Ok(port) => port.unwrap_or(0),
        Err(msg) => return Ok(ToolsCallResult::error(msg)),
    };
    if !(0..=u16::MAX as i64).contains(&port) {
        return Ok(ToolsCallResult::error(format!("invalid port: {}", port)));
    }

    // -t tcp, -u udp, -l listening, -n numeric, -p processes, -H no header
    let output = match run_command(&ctx.cancellation, "ss", &["-tulnpH"]).await {
        Ok(output) => output,
        Err(e) => return Ok(ToolsCallResult::error(format!("ss command failed: {}", e))),
    };
    if !output.success {
        return Ok(ToolsCallResult::error(format!(
            "ss command failed: {}",
            output.text.trim()
        )));
    }

    let results = parse_ss_output(&output.text, port as u16);
    let json =
        serde_json::to_string_pretty(&results).map_err(|e| McpError::InternalError(e.to_string()))?;
    Ok(ToolsCallResult::text(json))
}

static PROCESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"users:\(\("([^"]+)",pid=(\d+),"#).unwrap());

/// Parse `ss -tulnpH` output. `port` 0 keeps every listener; any other value
/// keeps only that local port.
pub fn parse_ss_output(output: &str, port: u16) -> Vec<PortStatus> {
    let mut results = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        // Netid State Recv-Q Send-Q Local-Address:Port Peer-Address:Port Process
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            continue;
        }

        let protocol = fields[0];
        let state = fields[1];
        let local_addr = fields[4];

        // Local address may be 127.0.0.1:80 or [::]:80.
        let Some(colon) = local_addr.rfind(':') else {
            continue;
        };
        let Ok(local_port) = local_addr[colon + 1..].parse::<u16>() else {
            continue;
        };

        if port != 0 && local_port != port {
            continue;
        }

        let process = if fields.len() > 6 {
            let raw = fields[6..].join(" ");
            match PROCESS_RE.captures(&raw) {
                Some(caps) => format!("{} (pid={})", &caps[1], &caps[2]),
                None => raw,
            }
        } else {
            String::new()
        };

        results.push(PortStatus {
            port: local_port,
            protocol: protocol.to_string(),
            state: state.to_string(),
            process,
        });
    }

    results
}
