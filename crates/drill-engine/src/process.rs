//! ---
//! drill_section: "04-execution-engine"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario execution engine."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! Child-process launching for `shell` steps.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use drill_common::config::ExecutionConfig;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Whether the process reported success.
    pub success: bool,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// Runs a command line and captures its output.
///
/// Dropping the returned future must terminate the child.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run `command` to completion.
    async fn launch(&self, command: &str) -> io::Result<ProcessOutput>;
}

/// Launches commands through a shell (`sh -c <command>` by default).
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    shell: String,
    flag: String,
}

impl ShellLauncher {
    /// Launcher using `shell flag <command>`.
    pub fn new(shell: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            flag: flag.into(),
        }
    }

    /// Launcher configured from the `[execution]` section.
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(config.shell.clone(), config.shell_flag.clone())
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::from_config(&ExecutionConfig::default())
    }
}

#[async_trait]
impl ProcessLauncher for ShellLauncher {
    async fn launch(&self, command: &str) -> io::Result<ProcessOutput> {
        debug!(shell = %self.shell, command, "spawning step command");
        let output = Command::new(&self.shell)
            .arg(&self.flag)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(ProcessOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let launcher = ShellLauncher::default();
        let output = launcher
            .launch("printf out; printf err >&2; exit 3")
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success);
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
    }

    #[tokio::test]
    async fn missing_shell_is_a_launch_error() {
        let launcher = ShellLauncher::new("/nonexistent/drill-shell", "-c");
        assert!(launcher.launch("true").await.is_err());
    }
}
