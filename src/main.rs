//! solc-buildpack - Cloud Native Buildpack for the Solidity compiler
//!
//! CLI entry point that dispatches to the detect and build phases.

use clap::Parser;
use console::style;
use solc_buildpack::cli::{Cli, Commands};
use solc_buildpack::config::LOG_LEVEL;
use solc_buildpack::error::BuildpackResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// CNB exit code for a failed detection
const DETECT_FAIL: u8 = 100;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} [{}] {}", style("Error:").red().bold(), e.step(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BuildpackResult<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging: 0 = info, 1+ = debug; BP_LOG_LEVEL=DEBUG also enables debug
    let debug_env = std::env::var(LOG_LEVEL).is_ok_and(|v| v.eq_ignore_ascii_case("debug"));
    let filter = if cli.verbose > 0 || debug_env {
        EnvFilter::new("solc_buildpack=debug")
    } else {
        EnvFilter::new("solc_buildpack=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Detect(args) => {
            if solc_buildpack::cli::commands::detect(args).await? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(DETECT_FAIL))
            }
        }
        Commands::Build(args) => {
            solc_buildpack::cli::commands::build(args, &cli.buildpack_dir).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
