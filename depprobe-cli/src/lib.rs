//! depprobe command-line interface.
//!
//! The binary in `main.rs` is a thin shell over these modules so command
//! handlers and renderers can be tested directly.
//!
//! - [`cli`]: argument definitions
//! - [`commands`]: one handler per subcommand
//! - [`output`]: text / JSON rendering
//! - [`logging`]: tracing subscriber setup
//! - [`error`]: `CliError` and exit codes

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
