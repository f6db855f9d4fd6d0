//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default configuration file, used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "depprobe.toml";

/// depprobe -- dependency inventory for hosts, containers and compose stacks.
///
/// Use `depprobe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "depprobe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file [default: depprobe.toml].
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "json")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration path and whether it was given explicitly.
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        }
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the dependencies of one target.
    Resolve(ResolveArgs),

    /// Resolve a JSON file of requests in parallel.
    Batch(BatchArgs),

    /// List detector names in priority order.
    Detectors,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- resolve ----

/// Resolve the dependencies of one target.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Target: host, container:<id>, docker:<id> or compose:<stack>.
    #[arg(default_value = "host")]
    pub target: String,

    /// Treat TARGET as a bare container ID or name.
    #[arg(long)]
    pub container: bool,

    /// Project directory on the target.
    #[arg(short = 'w', long)]
    pub working_dir: Option<String>,

    /// Python virtual environment to use instead of discovery.
    #[arg(long)]
    pub venv_path: Option<String>,

    /// Leave out system-wide packages.
    #[arg(long)]
    pub skip_system_scope: bool,

    /// Do not compute location and package hashes.
    #[arg(long)]
    pub skip_hash_collection: bool,

    /// Only report target identity.
    #[arg(long)]
    pub only_container_info: bool,

    /// Comma-separated detector names to run (default: all).
    #[arg(long, value_name = "NAMES")]
    pub select_detectors: Option<String>,
}

// ---- batch ----

/// Resolve a JSON array of requests.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSON file: `[{"target": "...", "working_dir": "...", "label": "..."}]`.
    pub file: PathBuf,

    /// Override the number of parallel workers.
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Skip requests that have not started once one fails.
    #[arg(long)]
    pub fail_fast: bool,

    /// Leave out system-wide packages.
    #[arg(long)]
    pub skip_system_scope: bool,

    /// Do not compute location and package hashes.
    #[arg(long)]
    pub skip_hash_collection: bool,

    /// Comma-separated detector names to run (default: all).
    #[arg(long, value_name = "NAMES")]
    pub select_detectors: Option<String>,
}

// ---- config ----

/// Manage depprobe configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, resolver, docker).
        #[arg(long)]
        section: Option<String>,
    },
}
