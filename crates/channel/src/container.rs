//! Single-container channel.
//!
//! Commands run through the Docker exec API as `sh -c <command>`. Minimal
//! images (distroless, scratch-based) have no shell; once the runtime reports
//! that `sh` is missing, the channel switches to direct exec of whitespace
//! tokenized argv and rejects anything that needs shell interpretation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use depprobe_core::channel::{
    BoxFuture, CommandChannel, CommandOutput, ContainerIdentity, TargetIdentity, shell_quote,
};
use tracing::{debug, info};

use crate::docker::{DockerClient, validate_identifier};
use crate::error::ChannelError;

/// Sequences that only a shell can interpret.
const SHELL_METACHARACTERS: &[&str] = &["&&", "||", "|", ">", "<", ";", "`", "$(", "$"];

const NO_SHELL_MESSAGE: &str =
    "Command requires shell features but no shell is available in container";

/// Channel executing commands inside one running container.
pub struct ContainerChannel<D: DockerClient> {
    client: Arc<D>,
    identity: TargetIdentity,
    container_id: String,
    shell_missing: AtomicBool,
}

impl<D: DockerClient> ContainerChannel<D> {
    /// Resolves `identifier` (ID or name) and requires the container to be running.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InvalidIdentifier` for malformed references
    /// - `ChannelError::ContainerNotFound` when the container does not exist
    /// - `ChannelError::ContainerNotRunning` when it exists but is not running
    pub async fn connect(client: Arc<D>, identifier: &str) -> Result<Self, ChannelError> {
        validate_identifier(identifier)?;
        let container = client.inspect_container(identifier).await?;
        if container.state != "running" {
            return Err(ChannelError::ContainerNotRunning {
                name: identifier.to_owned(),
                status: container.state,
            });
        }
        info!(
            container = %container.name,
            image = %container.image,
            "connected to container"
        );
        Ok(Self {
            client,
            container_id: container.id.clone(),
            identity: TargetIdentity::Container(container),
            shell_missing: AtomicBool::new(false),
        })
    }

    /// Identity resolved at connect time.
    pub fn container(&self) -> Option<&ContainerIdentity> {
        self.identity.container()
    }

    /// Whether the container was found to have no shell.
    pub fn shell_missing(&self) -> bool {
        self.shell_missing.load(Ordering::Relaxed)
    }

    async fn run(&self, command: &str, working_dir: Option<&str>) -> CommandOutput {
        if !self.shell_missing() {
            let argv = vec!["sh".to_owned(), "-c".to_owned(), command.to_owned()];
            match self.client.exec(&self.container_id, argv, working_dir).await {
                Ok(output) if !reports_missing_shell(&output) => return output,
                Ok(_) => {}
                Err(e) if indicates_missing_shell(&e.to_string()) => {}
                Err(e) => return CommandOutput::failure(format!("Command execution failed: {e}")),
            }
            debug!(container = %self.container_id, "no shell in container, using direct exec");
            self.shell_missing.store(true, Ordering::Relaxed);
        }
        self.run_direct(command, working_dir).await
    }

    async fn run_direct(&self, command: &str, working_dir: Option<&str>) -> CommandOutput {
        let argv = match parse_simple_command(command) {
            Some(argv) => argv,
            None => return CommandOutput::failure(NO_SHELL_MESSAGE),
        };
        match self.client.exec(&self.container_id, argv, working_dir).await {
            Ok(output) => output,
            Err(e) => CommandOutput::failure(format!("Command execution failed: {e}")),
        }
    }
}

impl<D: DockerClient> CommandChannel for ContainerChannel<D> {
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
        Box::pin(async move {
            let command = format!("test -e {}", shell_quote(path));
            self.run(&command, None).await.is_success()
        })
    }
}

fn indicates_missing_shell(text: &str) -> bool {
    text.contains("executable file not found") && text.contains("sh")
}

fn reports_missing_shell(output: &CommandOutput) -> bool {
    matches!(output.exit_code, 126 | 127)
        && (indicates_missing_shell(&output.stdout) || indicates_missing_shell(&output.stderr))
}

/// Splits a command into argv when it needs no shell interpretation.
///
/// Single and double quotes group words and are stripped. Returns `None`
/// for commands containing shell metacharacters or nothing to run.
pub fn parse_simple_command(command: &str) -> Option<Vec<String>> {
    if SHELL_METACHARACTERS.iter().any(|m| command.contains(m)) {
        return None;
    }

    let mut argv = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in command.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    argv.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return None;
    }
    if in_word {
        argv.push(current);
    }

    if argv.is_empty() { None } else { Some(argv) }
}
