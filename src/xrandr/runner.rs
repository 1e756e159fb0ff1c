// SPDX-License-Identifier: GPL-3.0-only
//! Subprocess execution for the display tools
//!
//! [`CommandRunner`] is the seam between the xrandr and ddcutil front ends
//! and the operating system. The system runner spawns real processes with a timeout;
//! tests substitute a recording fake.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{AppError, Result};

/// Captured result of one finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Human readable exit status ("exit status: 1")
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Short reason for a failed run, preferring the tool's own message
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.status.clone()
        } else {
            format!("{} ({})", stderr, self.status)
        }
    }
}

/// Runs a program with arguments and captures its output
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Spawns real processes through tokio
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let command_line = format!("{} {}", program, args.join(" "));
        debug!("running {}", command_line);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AppError::ToolUnavailable {
                tool: program.to_string(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(AppError::ToolUnavailable {
                    tool: program.to_string(),
                    source,
                });
            }
            Err(_) => {
                warn!("{} did not finish within {:?}", command_line, self.timeout);
                return Err(AppError::Timeout {
                    command: command_line,
                    after: self.timeout,
                });
            }
        };

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_prefers_stderr() {
        let output = CommandOutput {
            success: false,
            status: "exit status: 1".to_string(),
            stdout: String::new(),
            stderr: "warning: output HDMI-9 not found; ignoring\n".to_string(),
        };
        assert_eq!(
            output.failure_reason(),
            "warning: output HDMI-9 not found; ignoring (exit status: 1)"
        );

        let silent = CommandOutput {
            stderr: "  ".to_string(),
            ..output
        };
        assert_eq!(silent.failure_reason(), "exit status: 1");
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_unavailable() {
        let runner = SystemRunner::new(Duration::from_secs(1));
        let err = runner
            .run("lumonitor-test-no-such-binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ToolUnavailable { .. }));
    }
}
