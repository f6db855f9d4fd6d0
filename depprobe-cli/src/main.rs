use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use depprobe_cli::cli::{Cli, Commands};
use depprobe_cli::commands::config as config_command;
use depprobe_cli::commands::{self, batch, detectors, resolve};
use depprobe_cli::error::CliError;
use depprobe_cli::logging;
use depprobe_cli::output::OutputWriter;
use depprobe_core::config::DepprobeConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (config_path, explicit) = cli.config_path();
    let writer = OutputWriter::new(cli.output);

    // `config` reports file problems itself instead of failing here
    let mut config = match cli.command {
        Commands::Config(_) => DepprobeConfig::default(),
        _ => commands::load_config(&config_path, explicit).await?,
    };
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
        config.validate().map_err(CliError::from)?;
    }
    logging::init_tracing(&config.general)?;

    tracing::debug!(config = %config_path.display(), explicit, "depprobe starting");

    match cli.command {
        Commands::Resolve(args) => resolve::execute(args, &config, &writer).await?,
        Commands::Batch(args) => batch::execute(args, &config, &writer).await?,
        Commands::Detectors => detectors::execute(&config, &writer)?,
        Commands::Config(args) => {
            config_command::execute(args, &config_path, explicit, &writer).await?;
        }
    }

    Ok(())
}
