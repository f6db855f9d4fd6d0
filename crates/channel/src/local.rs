//! Local process channel.
//!
//! Runs commands on the machine depprobe itself runs on, through `sh -c`.
//! Every command is bounded by a hard timeout. A timeout or spawn failure is
//! reported as exit code 1 with a synthetic stderr message, never as an error.

use std::process::Stdio;
use std::time::Duration;

use depprobe_core::channel::{BoxFuture, CommandChannel, CommandOutput, TargetIdentity};
use tokio::process::Command;
use tracing::debug;

/// Default per-command timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Channel executing commands on the local host.
#[derive(Debug, Clone)]
pub struct LocalChannel {
    identity: TargetIdentity,
    timeout: Duration,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_COMMAND_TIMEOUT)
    }

    /// Creates a channel with a custom command timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            identity: TargetIdentity::Host,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, command: &str, working_dir: Option<&str>) -> CommandOutput {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return CommandOutput::failure(format!("Command execution failed: {e}"));
            }
            Err(_) => {
                debug!(command, timeout_secs = self.timeout.as_secs(), "command timed out");
                return CommandOutput::failure(format!(
                    "Command timed out after {} seconds",
                    self.timeout.as_secs()
                ));
            }
        };

        CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            // killed by a signal: no exit code
            exit_code: output.status.code().map_or(1, i64::from),
        }
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandChannel for LocalChannel {
    fn identity(&self) -> &TargetIdentity {
        &self.identity
    }

    fn execute<'a>(
        &'a self,
        command: &'a str,
        working_dir: Option<&'a str>,
    ) -> BoxFuture<'a, CommandOutput> {
        Box::pin(self.run(command, working_dir))
    }

    fn path_exists<'a>(&'a self, path: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { tokio::fs::try_exists(path).await.unwrap_or(false) })
    }
}
