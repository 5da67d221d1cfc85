//! Tool Handlers
//!
//! Thin adapters between the dispatcher and the host: validate arguments,
//! run the command or syscall under the request's cancellation scope,
//! best-effort persist, and return a single text block.

pub mod diagnostics;
pub mod latency;
pub mod port;
pub mod records;
pub mod system;
pub mod systemd;
pub mod traceroute;

use serde_json::Value;

use crate::mcp::registry::ToolRegistry;

/// Register the full tool catalog.
pub fn register_all_tools(registry: &mut ToolRegistry) {
    latency::register_tools(registry);
    traceroute::register_tools(registry);
    system::register_tools(registry);
    port::register_tools(registry);
    systemd::register_tools(registry);
    diagnostics::register_tools(registry);
    records::register_tools(registry);
}

/// Maximum length of a hostname argument (RFC 1035).
const MAX_TARGET_LEN: usize = 253;

/// Validate an argument that will be passed to a command line as a host.
///
/// Arguments are always passed positionally, never through a shell; this is
/// an additional guard on top of that.
pub(crate) fn validate_target(target: &str) -> Result<(), String> {
    if target.is_empty() {
        return Err("target cannot be empty".to_string());
    }

    if target.contains([';', '&', '|', '`', '$', '<', '>']) {
        return Err("invalid characters in target".to_string());
    }

    if target.parse::<std::net::IpAddr>().is_ok() {
        return Ok(());
    }

    if target.len() > MAX_TARGET_LEN {
        return Err("target too long".to_string());
    }

    Ok(())
}

/// Extract an optional integer argument, tolerating the float representation
/// JSON numbers arrive in.
pub(crate) fn optional_int_arg(args: &Value, key: &str) -> Result<Option<i64>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let number = value
                .as_f64()
                .ok_or_else(|| format!("'{}' must be a number", key))?;
            if number.fract() != 0.0 || number < i64::MIN as f64 || number > i64::MAX as f64 {
                return Err(format!("'{}' must be an integer", key));
            }
            Ok(Some(number as i64))
        }
    }
}

/// Extract a required string argument.
pub(crate) fn required_str_arg(args: &Value, key: &str) -> Result<String, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| format!("'{}' argument is required", key))
}
