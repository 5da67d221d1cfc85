//! System Diagnostics Tool
//!
//! One-shot collection of journal errors, syslog errors, the kernel ring
//! buffer tail, and login history. A source that cannot be read reports its
//! failure in-band instead of failing the whole call.

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{McpError, ToolsCallResult};
use crate::mcp::registry::{RegisteredTool, ToolBuilder, ToolRegistry, ToolResult};
use crate::runner::run_command;

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(system_diagnostics_tool());
}

const JOURNAL_ERROR_LINES: usize = 100;
const SYSLOG_ERROR_LINES: usize = 100;
const DMESG_LINES: usize = 50;
const LOGIN_ENTRIES: &str = "10";

const SYSLOG_PATH: &str = "/var/log/syslog";

#[derive(Debug, Serialize)]
pub struct DiagnosticsResult {
    pub journalctl_errors: Vec<String>,
    pub syslog_errors: Vec<String>,
    pub dmesg: Vec<String>,
    pub login_history: Vec<String>,
    pub failed_logins: Vec<String>,
}

fn system_diagnostics_tool() -> RegisteredTool {
    ToolBuilder::new("system_diagnostics")
        .description("Get system diagnostics (logs, dmesg, login history)")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        }))
        .build(system_diagnostics_handler)
}

async fn system_diagnostics_handler(ctx: ToolContext, _args: Value) -> ToolResult {
    let result = run_diagnostics(&ctx.cancellation).await;

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| McpError::InternalError(e.to_string()))?;
    ctx.persist("system_diagnostics", &json);
    Ok(ToolsCallResult::text(json))
}

pub async fn run_diagnostics(cancel: &CancellationToken) -> DiagnosticsResult {
    // Error-priority journal entries
    let journal_args = ["-p", "3", "-n", "100", "--no-pager"];
    let journalctl_errors = match command_lines(cancel, "journalctl", &journal_args).await {
        Ok(lines) if lines.is_empty() => vec!["No journalctl error logs found.".to_string()],
        Ok(lines) => truncate_head(lines, JOURNAL_ERROR_LINES),
        Err(msg) => vec![format!("Error running journalctl: {}", msg)],
    };

    let syslog_errors = match tokio::fs::read_to_string(SYSLOG_PATH).await {
        Ok(content) => {
            let matched = filter_error_lines(&content, SYSLOG_ERROR_LINES);
            if matched.is_empty() {
                vec![format!("No error lines found in {}", SYSLOG_PATH)]
            } else {
                matched
            }
        }
        Err(e) => vec![format!("Could not open {}: {}", SYSLOG_PATH, e)],
    };

    // Kernel ring buffer tail
    let dmesg = match command_lines(cancel, "dmesg", &[]).await {
        Ok(lines) => tail_lines(lines, DMESG_LINES),
        Err(msg) => vec![format!("Error running dmesg: {}", msg)],
    };

    let login_history = match command_lines(cancel, "last", &["-n", LOGIN_ENTRIES]).await {
        Ok(lines) => lines,
        Err(msg) => vec![format!("Error running last: {}", msg)],
    };

    // Reading /var/log/btmp requires root
    let failed_logins = match command_lines(cancel, "lastb", &["-n", LOGIN_ENTRIES]).await {
        Ok(lines) => lines,
        Err(msg) => vec![format!("Error running lastb: {}", msg)],
    };

    DiagnosticsResult {
        journalctl_errors,
        syslog_errors,
        dmesg,
        login_history,
        failed_logins,
    }
}

async fn command_lines(
    cancel: &CancellationToken,
    program: &str,
    args: &[&str],
) -> Result<Vec<String>, String> {
    let output = run_command(cancel, program, args)
        .await
        .map_err(|e| e.to_string())?;
    if !output.success {
        return Err(format!(
            "exit code {:?}: {}",
            output.exit_code,
            output.text.trim()
        ));
    }
    Ok(output.text.lines().map(str::to_string).collect())
}

/// Keep lines containing "error" (case-insensitive), bounded to the last
/// `count` matches.
pub fn filter_error_lines(content: &str, count: usize) -> Vec<String> {
    let matched: Vec<String> = content
        .lines()
        .filter(|line| line.to_lowercase().contains("error"))
        .map(str::to_string)
        .collect();
    tail_lines(matched, count)
}

fn tail_lines(lines: Vec<String>, count: usize) -> Vec<String> {
    if lines.len() > count {
        lines[lines.len() - count..].to_vec()
    } else {
        lines
    }
}

fn truncate_head(lines: Vec<String>, count: usize) -> Vec<String> {
    if lines.len() > count {
        lines[..count].to_vec()
    } else {
        lines
    }
}
