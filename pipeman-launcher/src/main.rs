//! Pipeman launcher
//!
//! Command-line entry point that compiles pipeline fragments and hands the
//! resulting pipeline objects to the deployer.

mod commands;
mod config;
mod deploy;
mod error;
mod git;
mod logging;

use clap::Parser;
use colored::*;
use commands::{Commands, handle_command};
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "pipeman")]
#[command(about = "Pipeline definition compiler and launcher", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match handle_command(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("{} {}", "Error:".red().bold(), err);
            ExitCode::from(err.exit_code())
        }
    }
}
