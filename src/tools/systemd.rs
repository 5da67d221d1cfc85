//! Systemd Tools
//!
//! Journal access and service control through `journalctl` / `systemctl`.

use serde_json::Value;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::ToolsCallResult;
use crate::mcp::registry::{RegisteredTool, ToolBuilder, ToolRegistry, ToolResult};
use crate::runner::run_command;

use super::{optional_int_arg, required_str_arg};

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(systemd_logs_tool());
    registry.register_tool(manage_service_tool());
    registry.register_tool(list_units_tool());
    registry.register_tool(list_unit_files_tool());
}

const DEFAULT_LOG_LINES: i64 = 100;

// ============================================================================
// systemd_logs
// ============================================================================

fn systemd_logs_tool() -> RegisteredTool {
    ToolBuilder::new("systemd_logs")
        .description("View the journalctl logs for a specific unit (default last 100 lines)")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "unit": { "type": "string", "description": "Systemd unit name (e.g. ssh, nginx)" },
                "lines": { "type": "integer", "description": "Number of lines to retrieve (default 100)" }
            },
            "required": ["unit"]
        }))
        .build(systemd_logs_handler)
}

async fn systemd_logs_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let unit = match required_str_arg(&args, "unit") {
        Ok(unit) if !unit.is_empty() => unit,
        Ok(_) => return Ok(ToolsCallResult::error("unit name cannot be empty")),
        Err(msg) => return Ok(ToolsCallResult::error(msg)),
    };

    let lines = match optional_int_arg(&args, "lines") {
        Ok(Some(lines)) if lines > 0 => lines,
        Ok(_) => DEFAULT_LOG_LINES,
        Err(msg) => return Ok(ToolsCallResult::error(msg)),
    };

    let lines_arg = lines.to_string();
    let output = match run_command(
        &ctx.cancellation,
        "journalctl",
        &["-u", &unit, "-n", &lines_arg, "--no-pager"],
    )
    .await
    {
        Ok(output) => output,
        Err(e) => {
            return Ok(ToolsCallResult::error(format!(
                "failed to run journalctl: {}",
                e
            )))
        }
    };
    if !output.success {
        return Ok(ToolsCallResult::error(format!(
            "failed to run journalctl: {}",
            output.text.trim()
        )));
    }

    let log_content = if output.text.trim().is_empty() {
        format!(
            "No logs found for unit '{}'. Please check if the unit name is correct or if it has any logs.",
            unit
        )
    } else {
        output.text
    };

    ctx.persist("systemd_logs", &log_content);
    Ok(ToolsCallResult::text(log_content))
}

// ============================================================================
// manage_service
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceAction {
    Start,
    Stop,
    Restart,
    Reload,
    Enable,
    Disable,
    Status,
}

impl ServiceAction {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "restart" => Some(Self::Restart),
            "reload" => Some(Self::Reload),
            "enable" => Some(Self::Enable),
            "disable" => Some(Self::Disable),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Reload => "reload",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Status => "status",
        }
    }
}

fn manage_service_tool() -> RegisteredTool {
    ToolBuilder::new("manage_service")
        .description("Manage systemd services")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "unit": { "type": "string", "description": "Systemd unit name" },
                "action": { "type": "string", "description": "Action to perform: start, stop, restart, reload, enable, disable, status" }
            },
            "required": ["unit", "action"]
        }))
        .build(manage_service_handler)
}

async fn manage_service_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let unit = match required_str_arg(&args, "unit") {
        Ok(unit) if !unit.is_empty() => unit,
        Ok(_) => return Ok(ToolsCallResult::error("unit name cannot be empty")),
        Err(msg) => return Ok(ToolsCallResult::error(msg)),
    };
    let action_str = match required_str_arg(&args, "action") {
        Ok(action) => action,
        Err(msg) => return Ok(ToolsCallResult::error(msg)),
    };
    let Some(action) = ServiceAction::parse(&action_str) else {
        return Ok(ToolsCallResult::error(format!(
            "invalid action '{}'. Allowed actions: start, stop, restart, reload, enable, disable, status",
            action_str
        )));
    };

    let output = match run_command(&ctx.cancellation, "systemctl", &[action.as_str(), &unit]).await
    {
        Ok(output) => output,
        Err(e) => {
            return Ok(ToolsCallResult::error(format!(
                "failed to execute systemctl {} {}: {}",
                action.as_str(),
                unit,
                e
            )))
        }
    };

    // `systemctl status` exits non-zero for stopped or failed units while
    // still printing exactly what the caller asked for.
    if !output.success && action != ServiceAction::Status {
        return Ok(ToolsCallResult::error(format!(
            "failed to execute systemctl {} {}: exit code {:?}, output: {}",
            action.as_str(),
            unit,
            output.exit_code,
            output.text.trim()
        )));
    }

    let result_msg = format!(
        "Successfully executed '{}' on service '{}'\nOutput:\n{}",
        action.as_str(),
        unit,
        output.text
    );

    ctx.persist("manage_service", &result_msg);
    Ok(ToolsCallResult::text(result_msg))
}

// ============================================================================
// systemd_list_units / systemd_list_unit_files
// ============================================================================

fn list_units_tool() -> RegisteredTool {
    ToolBuilder::new("systemd_list_units")
        .description("List all loaded systemd units (services)")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        }))
        .build(|ctx, _args| async move {
            run_listing(
                ctx,
                "systemd_list_units",
                &["list-units", "--type=service", "--all", "--no-pager"],
            )
            .await
        })
}

fn list_unit_files_tool() -> RegisteredTool {
    ToolBuilder::new("systemd_list_unit_files")
        .description("List all installed systemd unit files")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        }))
        .build(|ctx, _args| async move {
            run_listing(
                ctx,
                "systemd_list_unit_files",
                &["list-unit-files", "--type=service", "--no-pager"],
            )
            .await
        })
}

async fn run_listing(ctx: ToolContext, record_key: &str, args: &[&str]) -> ToolResult {
    let output = match run_command(&ctx.cancellation, "systemctl", args).await {
        Ok(output) => output,
        Err(e) => {
            return Ok(ToolsCallResult::error(format!(
                "failed to execute systemctl {}: {}",
                args[0], e
            )))
        }
    };
    if !output.success {
        return Ok(ToolsCallResult::error(format!(
            "failed to execute systemctl {}: {}",
            args[0],
            output.text.trim()
        )));
    }

    ctx.persist(record_key, &output.text);
    Ok(ToolsCallResult::text(output.text))
}
