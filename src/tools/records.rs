//! Record Query Tool
//!
//! Exposes the execution record log through the same tool surface that
//! populates it.

use serde_json::Value;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{McpError, ToolsCallResult};
use crate::mcp::registry::{RegisteredTool, ToolBuilder, ToolRegistry, ToolResult};

use super::required_str_arg;

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(read_records_tool());
}

fn read_records_tool() -> RegisteredTool {
    ToolBuilder::new("read_records")
        .description("Read execution records from the database")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "tool_name": { "type": "string", "description": "Tool name to query (latency, traceroute, system_stats, ...)" },
                "start_time": { "type": "string", "description": "Start time (YYYYMMDDhhmmss) for filtering" },
                "end_time": { "type": "string", "description": "End time (YYYYMMDDhhmmss) for filtering" }
            },
            "required": ["start_time"]
        }))
        .build(read_records_handler)
}

async fn read_records_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let start_time = match required_str_arg(&args, "start_time") {
        Ok(start) => start,
        Err(msg) => return Ok(ToolsCallResult::error(msg)),
    };
    let tool_name = args
        .get("tool_name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());
    let end_time = args.get("end_time").and_then(|v| v.as_str());

    let records = match ctx
        .record_store
        .query(tool_name, Some(&start_time), end_time)
    {
        Ok(records) => records,
        Err(e) => return Ok(ToolsCallResult::error(e.to_string())),
    };

    let json = serde_json::to_string_pretty(&records)
        .map_err(|e| McpError::InternalError(e.to_string()))?;
    Ok(ToolsCallResult::text(json))
}
