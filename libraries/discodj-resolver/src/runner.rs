//! Subprocess execution
//!
//! [`CommandRunner`] is the seam between the resolver and the operating
//! system; tests swap in a scripted runner.

use crate::error::{ResolverError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// What a finished process produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion, killing it after `timeout`
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput>;
}

/// Runs real processes with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ResolverError::Spawn {
                program: program.to_string(),
                source,
            })?;

        // Dropping the child on timeout kills it
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                debug!(program, ?timeout, "process killed after timeout");
                return Err(ResolverError::Timeout {
                    program: program.to_string(),
                    after: timeout,
                });
            }
        };

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
