//! CLI-specific error types and exit code mapping

use depprobe_core::error::DepprobeError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The target could not be reached or does not exist.
    #[error("{0}")]
    Target(String),

    /// Some requests of a batch failed.
    #[error("{failed} of {total} batch requests failed")]
    BatchFailed { failed: usize, total: usize },

    /// JSON serialisation or parsing failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other domain errors from depprobe-core.
    #[error("{0}")]
    Core(DepprobeError),
}

impl From<DepprobeError> for CliError {
    fn from(err: DepprobeError) -> Self {
        match err {
            DepprobeError::Config(e) => Self::Config(e.to_string()),
            DepprobeError::Target(e) => Self::Target(e.to_string()),
            DepprobeError::Io(e) => Self::Io(e),
            other => Self::Core(other),
        }
    }
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Target unreachable or missing    |
    /// | 4    | Batch finished with failures     |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Target(_) => 3,
            Self::BatchFailed { .. } => 4,
            Self::Io(_) => 10,
            Self::Json(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}
