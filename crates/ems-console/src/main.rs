//! `ems-console` command-line entry point

use anyhow::Result;
use clap::Parser;
use ems_console::cli::Cli;
use ems_console::commands;
use ems_console::{init_logging, ConsoleConfig, LogConfig};
use std::io::IsTerminal;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(
        &LogConfig::from_verbosity(cli.verbose)
            .with_format(cli.log_format)
            .with_ansi(std::io::stderr().is_terminal()),
    );

    let config = ConsoleConfig::load(cli.config.as_deref())?;
    commands::run(cli.command, &config).await
}
