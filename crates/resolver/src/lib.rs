#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`request`]: `TargetSpec`, `ResolveRequest`, `ResolveResult`
//! - [`factory`]: `ChannelFactory` trait and the Docker-backed `DockerChannelFactory`
//! - [`resolver`]: `DependencyResolver` and its bounded batch pool

pub mod factory;
pub mod request;
pub mod resolver;

// --- Public API Re-exports ---

pub use factory::{ChannelFactory, DockerChannelFactory};
pub use request::{ResolveRequest, ResolveResult, TargetSpec};
pub use resolver::{CANCELLED_MESSAGE, DependencyResolver, ResolverOptions};
