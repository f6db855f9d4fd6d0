#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`ChannelError`)
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`local`]: Local process channel (`LocalChannel`)
//! - [`container`]: Single-container channel (`ContainerChannel`)
//! - [`compose`]: Compose-stack identity channel (`ComposeChannel`)

pub mod compose;
pub mod container;
pub mod docker;
pub mod error;
pub mod local;

// --- Public API Re-exports ---

pub use compose::ComposeChannel;
pub use container::ContainerChannel;
pub use docker::{BollardDockerClient, DockerClient};
pub use error::ChannelError;
pub use local::LocalChannel;
