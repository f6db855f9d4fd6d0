//! Compose-stack channel.
//!
//! Identity only: it enumerates the running containers of one compose project
//! and never executes commands. Containers are matched by the compose project
//! label; runtimes where label filtering fails or finds nothing fall back to
//! the `<stack>_` / `<stack>-` container name prefix convention.

use std::sync::Arc;

use depprobe_core::channel::{
    BoxFuture, CommandChannel, CommandOutput, ContainerIdentity, StackIdentity, TargetIdentity,
};
use tracing::{debug, info, warn};

use crate::docker::{COMPOSE_PROJECT_LABEL, DockerClient, validate_identifier};
use crate::error::ChannelError;

const NO_EXEC_MESSAGE: &str = "Compose stack channel does not execute commands";

/// Channel representing a whole compose stack.
#[derive(Debug)]
pub struct ComposeChannel {
    identity: TargetIdentity,
}

impl ComposeChannel {
    /// Resolves the running containers of `stack`.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InvalidIdentifier` for malformed stack names
    /// - `ChannelError::StackEmpty` when no running container belongs to the stack
    /// - `ChannelError::DockerApi` when even the unfiltered listing fails
    pub async fn connect<D: DockerClient>(
        client: Arc<D>,
        stack: &str,
    ) -> Result<Self, ChannelError> {
        validate_identifier(stack)?;

        let label = format!("{COMPOSE_PROJECT_LABEL}={stack}");
        let mut containers = match client.list_running_containers(Some(&label)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(stack, error = %e, "label filter failed, falling back to name prefix");
                Vec::new()
            }
        };

        if containers.is_empty() {
            debug!(stack, "no labelled containers, matching by name prefix");
            let all = client.list_running_containers(None).await?;
            containers = all
                .into_iter()
                .filter(|c| belongs_to_stack(&c.name, stack))
                .collect();
        }

        if containers.is_empty() {
            return Err(ChannelError::StackEmpty(stack.to_owned()));
        }

        containers.sort_by(|a, b| a.name.cmp(&b.name));
        info!(stack, containers = containers.len(), "resolved compose stack");

        Ok(Self {
            identity: TargetIdentity::Stack(StackIdentity {
                project: stack.to_owned(),
                containers,
            }),
        })
    }

    /// Running containers of the stack, sorted by name.
    pub fn containers(&self) -> &[ContainerIdentity] {
        self.identity
            .stack()
            .map(|s| s.containers.as_slice())
            .unwrap_or_default()
    }
}

fn belongs_to_stack(container_name: &str, stack: &str) -> bool {
    container_name
        .strip_prefix(stack)
        .is_some_and(|rest| rest.starts_with('_') || rest.starts_with('-'))
}

impl CommandChannel for ComposeChannel {
    fn identity(&self) -> &TargetIdentity {
        &self.identity
    }

    fn execute<'a>(
        &'a self,
        _command: &'a str,
        _working_dir: Option<&'a str>,
    ) -> BoxFuture<'a, CommandOutput> {
        Box::pin(async { CommandOutput::failure(NO_EXEC_MESSAGE) })
    }

    fn path_exists<'a>(&'a self, _path: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async { false })
    }
}
