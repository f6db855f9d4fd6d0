//! Channel construction per request.
//!
//! The resolver never shares a channel between requests. [`ChannelFactory`]
//! opens a fresh one for every request, so a batch worker owns its channel
//! from start to finish.

use std::sync::Arc;
use std::time::Duration;

use depprobe_channel::{BollardDockerClient, ComposeChannel, ContainerChannel, LocalChannel};
use depprobe_core::config::DepprobeConfig;
use depprobe_core::{BoxFuture, CommandChannel, DepprobeError};
use tracing::debug;

use crate::request::TargetSpec;

/// Opens a command channel for a target.
///
/// Dyn-compatible so the resolver can hold it as `Arc<dyn ChannelFactory>`.
pub trait ChannelFactory: Send + Sync {
    /// # Errors
    ///
    /// Target construction failures: container not found or not running,
    /// empty compose stack, unreachable container runtime.
    fn open<'a>(
        &'a self,
        target: &'a TargetSpec,
    ) -> BoxFuture<'a, Result<Box<dyn CommandChannel>, DepprobeError>>;
}

/// Production factory: local process for the host, Docker for everything else.
#[derive(Debug, Clone)]
pub struct DockerChannelFactory {
    socket: String,
    connect_timeout_secs: u64,
    command_timeout: Duration,
}

impl DockerChannelFactory {
    /// `socket` may be empty for the platform default.
    pub fn new(socket: impl Into<String>, connect_timeout_secs: u64, command_timeout: Duration) -> Self {
        Self {
            socket: socket.into(),
            connect_timeout_secs,
            command_timeout,
        }
    }

    pub fn from_config(config: &DepprobeConfig) -> Self {
        Self::new(
            config.docker.socket.clone(),
            config.docker.connect_timeout_secs,
            Duration::from_secs(config.resolver.command_timeout_secs),
        )
    }

    async fn open_target(
        &self,
        target: &TargetSpec,
    ) -> Result<Box<dyn CommandChannel>, DepprobeError> {
        match target {
            TargetSpec::Host => Ok(Box::new(LocalChannel::with_timeout(self.command_timeout))),
            TargetSpec::Container(id) => {
                let client = Arc::new(self.docker_client()?);
                let channel = ContainerChannel::connect(client, id).await?;
                Ok(Box::new(channel))
            }
            TargetSpec::ComposeStack(stack) => {
                let client = Arc::new(self.docker_client()?);
                let channel = ComposeChannel::connect(client, stack).await?;
                Ok(Box::new(channel))
            }
        }
    }

    fn docker_client(&self) -> Result<BollardDockerClient, DepprobeError> {
        debug!(socket = %self.socket, "connecting to docker");
        Ok(BollardDockerClient::connect(
            &self.socket,
            self.connect_timeout_secs,
        )?)
    }
}

impl ChannelFactory for DockerChannelFactory {
    fn open<'a>(
        &'a self,
        target: &'a TargetSpec,
    ) -> BoxFuture<'a, Result<Box<dyn CommandChannel>, DepprobeError>> {
        Box::pin(self.open_target(target))
    }
}
