//! Traceroute Tool
//!
//! Wraps `traceroute` with fast-path flags and returns the raw hop listing.

use serde_json::Value;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::ToolsCallResult;
use crate::mcp::registry::{RegisteredTool, ToolBuilder, ToolRegistry, ToolResult};
use crate::runner::run_command;

use super::{required_str_arg, validate_target};

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(traceroute_tool());
}

fn traceroute_tool() -> RegisteredTool {
    ToolBuilder::new("traceroute")
        .description("Trace path to a network target")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "target": { "type": "string", "description": "Target IP or hostname" }
            },
            "required": ["target"]
        }))
        .build(traceroute_handler)
}

async fn traceroute_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let target = match required_str_arg(&args, "target") {
        Ok(target) => target,
        Err(msg) => return Ok(ToolsCallResult::error(msg)),
    };
    if let Err(msg) = validate_target(&target) {
        return Ok(ToolsCallResult::error(format!("invalid target: {}", msg)));
    }

    // -n skip reverse DNS, -w 1s wait, -q one probe per hop, -m 20 hops max.
    let output = match run_command(
        &ctx.cancellation,
        "traceroute",
        &["-n", "-w", "1", "-q", "1", "-m", "20", &target],
    )
    .await
    {
        Ok(output) => output,
        Err(e) => return Ok(ToolsCallResult::error(format!("traceroute failed: {}", e))),
    };

    if !output.success && output.text.is_empty() {
        return Ok(ToolsCallResult::error(format!(
            "traceroute failed with exit code {:?}",
            output.exit_code
        )));
    }

    ctx.persist("traceroute", &output.text);
    Ok(ToolsCallResult::text(output.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_store::NullRecordStore;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn test_ctx() -> ToolContext {
        ToolContext::new(CancellationToken::new(), Arc::new(NullRecordStore))
    }

    #[tokio::test]
    async fn test_rejects_injection_attempt() {
        let result = traceroute_handler(
            test_ctx(),
            serde_json::json!({"target": "8.8.8.8; rm -rf /"}),
        )
        .await
        .unwrap();

        assert_eq!(result.is_error, Some(true));
        let text = serde_json::to_value(&result).unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains("invalid characters in target"));
    }

    #[tokio::test]
    async fn test_rejects_missing_target() {
        let result = traceroute_handler(test_ctx(), serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }
}
