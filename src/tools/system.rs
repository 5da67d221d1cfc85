//! System Tools
//!
//! Host metrics sampling (`system_stats`) and process termination (`pkill`).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use sysinfo::{Disks, Networks, Pid, ProcessesToUpdate, System};
use tokio_util::sync::CancellationToken;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{McpError, ToolsCallResult};
use crate::mcp::registry::{RegisteredTool, ToolBuilder, ToolRegistry, ToolResult};

use super::optional_int_arg;

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(system_stats_tool());
    registry.register_tool(kill_process_tool());
}

/// Window over which rates (CPU, process CPU, network bytes) are measured.
const SAMPLE_WINDOW: Duration = Duration::from_secs(5);

const TOP_PROCESS_COUNT: usize = 10;

// ============================================================================
// system_stats
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub disk: DiskStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_cpu_processes: Vec<ProcessInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_mem_processes: Vec<ProcessInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub network: Vec<NetworkStats>,
}

#[derive(Debug, Serialize)]
pub struct CpuStats {
    pub usage_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct MemoryStats {
    pub total: u64,
    pub available: u64,
    pub used_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct DiskStats {
    pub path: String,
    pub total: u64,
    pub free: u64,
    pub used_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Formatted value, e.g. "12.50%".
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct NetworkStats {
    pub interface: String,
    /// e.g. "10.5 KB/s"
    pub rx: String,
    pub tx: String,
}

fn system_stats_tool() -> RegisteredTool {
    ToolBuilder::new("system_stats")
        .description("Get system statistics")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        }))
        .build(system_stats_handler)
}

async fn system_stats_handler(ctx: ToolContext, _args: Value) -> ToolResult {
    match gather_system_stats(&ctx.cancellation).await {
        Ok(stats) => {
            let json = serde_json::to_string_pretty(&stats)
                .map_err(|e| McpError::InternalError(e.to_string()))?;
            ctx.persist("system_stats", &json);
            Ok(ToolsCallResult::text(json))
        }
        Err(msg) => Ok(ToolsCallResult::error(msg)),
    }
}

/// Collect host statistics. The duration-based samples (CPU, processes,
/// network) run concurrently so the call costs one window, not three.
pub async fn gather_system_stats(cancel: &CancellationToken) -> Result<SystemStats, String> {
    let sampling = async {
        tokio::join!(
            sample_cpu_usage(),
            sample_top_processes(),
            sample_network_rates()
        )
    };

    let (cpu_usage, (top_cpu_processes, top_mem_processes), network) = tokio::select! {
        _ = cancel.cancelled() => return Err("system stats sampling cancelled".to_string()),
        sampled = sampling => sampled,
    };

    // Memory and disk are instantaneous.
    let mut sys = System::new();
    sys.refresh_memory();
    let total = sys.total_memory();
    let memory = MemoryStats {
        total,
        available: sys.available_memory(),
        used_percent: if total > 0 {
            sys.used_memory() as f64 / total as f64 * 100.0
        } else {
            0.0
        },
    };

    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .ok_or_else(|| "failed to get disk usage for /".to_string())?;
    let disk_total = root.total_space();
    let disk_free = root.available_space();
    let disk = DiskStats {
        path: "/".to_string(),
        total: disk_total,
        free: disk_free,
        used_percent: if disk_total > 0 {
            (disk_total - disk_free) as f64 / disk_total as f64 * 100.0
        } else {
            0.0
        },
    };

    Ok(SystemStats {
        cpu: CpuStats {
            usage_percent: cpu_usage,
        },
        memory,
        disk,
        top_cpu_processes,
        top_mem_processes,
        network,
    })
}

/// Overall CPU usage over the sampling window.
async fn sample_cpu_usage() -> f64 {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    tokio::time::sleep(SAMPLE_WINDOW).await;
    sys.refresh_cpu_usage();
    sys.global_cpu_usage() as f64
}

/// Top processes by CPU and by memory share over the sampling window.
async fn sample_top_processes() -> (Vec<ProcessInfo>, Vec<ProcessInfo>) {
    let mut sys = System::new();
    // First refresh seeds the per-process CPU counters.
    sys.refresh_processes(ProcessesToUpdate::All, true);
    tokio::time::sleep(SAMPLE_WINDOW).await;
    sys.refresh_processes(ProcessesToUpdate::All, true);
    sys.refresh_memory();

    let total_memory = sys.total_memory();
    let mut entries: Vec<(u32, String, f32, f64)> = sys
        .processes()
        .iter()
        .map(|(pid, process)| {
            let mem_percent = if total_memory > 0 {
                process.memory() as f64 / total_memory as f64 * 100.0
            } else {
                0.0
            };
            (
                pid.as_u32(),
                process.name().to_string_lossy().into_owned(),
                process.cpu_usage(),
                mem_percent,
            )
        })
        .collect();

    entries.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
    let top_cpu = entries
        .iter()
        .take(TOP_PROCESS_COUNT)
        .map(|(pid, name, cpu, _)| ProcessInfo {
            pid: *pid,
            name: name.clone(),
            value: format!("{:.2}%", cpu),
        })
        .collect();

    entries.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(Ordering::Equal));
    let top_mem = entries
        .iter()
        .take(TOP_PROCESS_COUNT)
        .map(|(pid, name, _, mem)| ProcessInfo {
            pid: *pid,
            name: name.clone(),
            value: format!("{:.2}%", mem),
        })
        .collect();

    (top_cpu, top_mem)
}

/// Per-interface receive/transmit rates over the sampling window.
async fn sample_network_rates() -> Vec<NetworkStats> {
    let start: HashMap<String, (u64, u64)> = Networks::new_with_refreshed_list()
        .iter()
        .map(|(name, data)| (name.clone(), (data.total_received(), data.total_transmitted())))
        .collect();

    tokio::time::sleep(SAMPLE_WINDOW).await;

    let seconds = SAMPLE_WINDOW.as_secs_f64();
    let mut results: Vec<NetworkStats> = Networks::new_with_refreshed_list()
        .iter()
        .filter_map(|(name, data)| {
            let (rx_start, tx_start) = *start.get(name)?;
            let rx_rate = data.total_received().saturating_sub(rx_start) as f64 / seconds;
            let tx_rate = data.total_transmitted().saturating_sub(tx_start) as f64 / seconds;
            Some(NetworkStats {
                interface: name.clone(),
                rx: format!("{}/s", humanize_bytes(rx_rate)),
                tx: format!("{}/s", humanize_bytes(tx_rate)),
            })
        })
        .collect();

    results.sort_by(|a, b| a.interface.cmp(&b.interface));
    results
}

fn humanize_bytes(mut value: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

// ============================================================================
// pkill
// ============================================================================

fn kill_process_tool() -> RegisteredTool {
    ToolBuilder::new("pkill")
        .description("Kill a process by PID")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "pid": { "type": "integer", "description": "Process ID to kill" }
            },
            "required": ["pid"]
        }))
        .build(kill_process_handler)
}

async fn kill_process_handler(_ctx: ToolContext, args: Value) -> ToolResult {
    let pid = match optional_int_arg(&args, "pid") {
        Ok(Some(pid)) => pid,
        Ok(None) => return Ok(ToolsCallResult::error("invalid pid")),
        Err(msg) => return Ok(ToolsCallResult::error(msg)),
    };

    if pid <= 0 || pid > u32::MAX as i64 {
        return Ok(ToolsCallResult::error(format!("invalid pid: {}", pid)));
    }
    let pid = Pid::from_u32(pid as u32);

    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), false);

    match sys.process(pid) {
        Some(process) => {
            if process.kill() {
                Ok(ToolsCallResult::text(format!("Process {} killed", pid)))
            } else {
                Ok(ToolsCallResult::error(format!(
                    "failed to kill process {}",
                    pid
                )))
            }
        }
        None => Ok(ToolsCallResult::error(format!("process not found: {}", pid))),
    }
}
