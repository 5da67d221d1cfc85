//! Latency Tool
//!
//! ICMP echo round-trips via `ping`, parsed into a structured summary.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::ToolsCallResult;
use crate::mcp::registry::{RegisteredTool, ToolBuilder, ToolRegistry, ToolResult};
use crate::runner::run_command;

use super::{required_str_arg, validate_target};

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(latency_tool());
}

/// Parsed ping summary. Fields are kept as formatted strings to preserve the
/// unit in records and agent output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_latency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_loss: Option<String>,
}

fn latency_tool() -> RegisteredTool {
    ToolBuilder::new("latency")
        .description("Check network latency to a target")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "target": { "type": "string", "description": "Target IP or hostname" },
                "mode": { "type": "string", "description": "quick (10 pkts) or standard (100 pkts)" }
            },
            "required": ["target", "mode"]
        }))
        .build(latency_handler)
}

async fn latency_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let target = match required_str_arg(&args, "target") {
        Ok(target) => target,
        Err(msg) => return Ok(ToolsCallResult::error(msg)),
    };
    if let Err(msg) = validate_target(&target) {
        return Ok(ToolsCallResult::error(format!("invalid target: {}", msg)));
    }

    let mode = args
        .get("mode")
        .and_then(|m| m.as_str())
        .unwrap_or("")
        .to_lowercase();
    let count = match mode.as_str() {
        "quick" => "10",
        "standard" => "100",
        "" => {
            return Ok(ToolsCallResult::error(
                "Please specify the test mode: 'quick' (10 packets) or 'standard' (100 packets).",
            ))
        }
        _ => {
            return Ok(ToolsCallResult::error(
                "Invalid mode. Please specify: 'quick' or 'standard'.",
            ))
        }
    };

    // -i 0.2 shortens the interval, -q keeps only the summary.
    let output = match run_command(
        &ctx.cancellation,
        "ping",
        &["-c", count, "-i", "0.2", "-q", &target],
    )
    .await
    {
        Ok(output) => output,
        Err(e) => return Ok(ToolsCallResult::error(format!("ping failed: {}", e))),
    };

    // ping exits non-zero on any loss or timeout; the summary is still worth
    // parsing as long as there is output.
    if output.text.is_empty() && !output.success {
        return Ok(ToolsCallResult::error("ping failed: no output"));
    }

    match parse_ping_output(&output.text, &mode) {
        Ok(result) => {
            let json = serde_json::to_string(&result)
                .map_err(|e| crate::mcp::protocol::McpError::InternalError(e.to_string()))?;
            ctx.persist("latency", &json);
            Ok(ToolsCallResult::text(json))
        }
        Err(msg) => Ok(ToolsCallResult::error(msg)),
    }
}

static LOSS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)% packet loss").unwrap());

// iputils prints "rtt min/avg/max/mdev", busybox "round-trip min/avg/max".
static RTT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:rtt|round-trip) min/avg/max/(?:mdev|stddev) = ([0-9.]+)/([0-9.]+)/([0-9.]+)/([0-9.]+) ms")
        .unwrap()
});

/// Parse the summary block of `ping -q` output.
///
/// Quick mode reports only the average; standard mode adds jitter (mdev) and
/// packet loss. Total loss yields a result with only `packet_loss` set.
pub fn parse_ping_output(output: &str, mode: &str) -> Result<LatencyResult, String> {
    let packet_loss = LOSS_RE
        .captures(output)
        .map(|caps| format!("{}%", &caps[1]));

    let rtt = RTT_RE.captures(output);

    let (avg_latency, jitter) = match rtt {
        Some(caps) => (
            Some(format!("{} ms", &caps[2])),
            Some(format!("{} ms", &caps[4])),
        ),
        None => {
            // No RTT line at all: fine when every packet was lost, a parse
            // failure otherwise.
            if packet_loss.as_deref() == Some("100%") {
                return Ok(LatencyResult {
                    avg_latency: None,
                    jitter: None,
                    packet_loss,
                });
            }
            return Err("could not parse ping statistics".to_string());
        }
    };

    if mode == "quick" {
        return Ok(LatencyResult {
            avg_latency,
            jitter: None,
            packet_loss: None,
        });
    }

    Ok(LatencyResult {
        avg_latency,
        jitter,
        packet_loss,
    })
}
