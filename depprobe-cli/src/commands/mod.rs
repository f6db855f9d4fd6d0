//! Command handlers -- one module per subcommand

pub mod batch;
pub mod config;
pub mod detectors;
pub mod resolve;

use std::path::Path;

use depprobe_core::config::DepprobeConfig;
use depprobe_core::error::{ConfigError, DepprobeError};
use depprobe_detector::parse_detector_list;
use depprobe_resolver::ResolverOptions;

use crate::error::CliError;

/// Load the configuration for a command.
///
/// A missing file falls back to defaults plus environment overrides, unless
/// the path was given explicitly on the command line.
pub async fn load_config(path: &Path, explicit: bool) -> Result<DepprobeConfig, CliError> {
    match DepprobeConfig::load(path).await {
        Ok(config) => Ok(config),
        Err(DepprobeError::Config(ConfigError::FileNotFound { .. })) if !explicit => {
            Ok(DepprobeConfig::from_env()?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Resolver flags shared by `resolve` and `batch`.
pub(crate) struct ResolverFlags<'a> {
    pub skip_system_scope: bool,
    pub skip_hash_collection: bool,
    pub select_detectors: Option<&'a str>,
}

impl ResolverFlags<'_> {
    /// Apply the flags on top of the configured resolver options.
    pub(crate) fn apply(&self, config: &DepprobeConfig) -> ResolverOptions {
        let mut options = ResolverOptions::from_config(&config.resolver);
        options.skip_system_scope |= self.skip_system_scope;
        options.skip_hash_collection |= self.skip_hash_collection;
        if let Some(list) = self.select_detectors {
            options.selected_detectors = parse_detector_list(list);
        }
        options
    }
}
