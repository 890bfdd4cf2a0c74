mod artifacts;
mod bootstrap;
mod cli;
mod config;
mod error;
mod logs;
mod pipeline;
mod plan;
mod progress;
mod ui;
mod upload;

use anyhow::{Context, Result};
use cli::Cli;
use config::RunConfig;
use pipeline::{Console, RunSummary};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_normalized(std::env::args_os());

    // Initialize logging based on verbosity
    let log_level = match (cli.debug, cli.verbose) {
        (_, v) if v >= 2 => log::LevelFilter::Trace,
        (true, _) | (_, 1) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(summary) => {
            if !cli.quiet {
                pipeline::print_summary(&summary);
            }
            ExitCode::from(summary.exit_code())
        }
        Err(e) => {
            ui::error(&format!("{e:#}"));
            ExitCode::from(pipeline::EXIT_FATAL)
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    let config = RunConfig::from_cli(cli, &cwd)?;

    let console = Console {
        echo: true,
        quiet: cli.quiet,
    };
    pipeline::run(&config, console).with_context(|| format!("tofu {} failed", config.operation))
}
