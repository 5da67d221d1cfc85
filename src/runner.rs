//! Cancellable subprocess execution.
//!
//! Runs external CLIs with a static argument list, captures combined
//! stdout/stderr, and terminates the child when the request's cancellation
//! scope fires. Arguments are passed positionally; no shell is involved.

use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to read output of {program}: {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },

    #[error("command cancelled")]
    Cancelled,
}

/// Output of a finished subprocess.
///
/// A non-zero exit is not an error at this layer: tools like `ping` with
/// packet loss or `systemctl status` on a stopped unit exit non-zero while
/// still producing the output the caller wants. Handlers decide.
#[derive(Debug)]
pub struct CommandOutput {
    /// Combined stdout and stderr, lossily decoded.
    pub text: String,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    pub success: bool,
}

/// Run `program` with `args`, racing completion against `cancel`.
///
/// On cancellation the child is killed (it never outlives the request).
pub async fn run_command(
    cancel: &CancellationToken,
    program: &str,
    args: &[&str],
) -> Result<CommandOutput, RunnerError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RunnerError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let output = tokio::select! {
        // Dropping the in-flight future kills the child via kill_on_drop.
        _ = cancel.cancelled() => return Err(RunnerError::Cancelled),
        output = child.wait_with_output() => output.map_err(|source| RunnerError::Io {
            program: program.to_string(),
            source,
        })?,
    };

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(CommandOutput {
        text,
        exit_code: output.status.code(),
        success: output.status.success(),
    })
}
