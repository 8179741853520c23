//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// solc-buildpack - Cloud Native Buildpack for the Solidity compiler
///
/// Detects Solidity projects and contributes a cached layer containing
/// Node.js and solc.
#[derive(Parser, Debug)]
#[command(name = "solc-buildpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Directory containing buildpack.toml
    #[arg(long, global = true, env = "CNB_BUILDPACK_DIR", default_value = ".")]
    pub buildpack_dir: PathBuf,
}

/// Buildpack phases
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether the application contains Solidity sources
    Detect(DetectArgs),

    /// Contribute the solc layer and launch processes
    Build(BuildArgs),
}

/// Arguments for the detect phase
#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Platform directory
    pub platform: PathBuf,

    /// Build plan output path
    pub plan: PathBuf,

    /// Application directory (defaults to current directory)
    #[arg(long)]
    pub app: Option<PathBuf>,
}

/// Arguments for the build phase
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Layers directory
    pub layers: PathBuf,

    /// Platform directory
    pub platform: PathBuf,

    /// Resolved buildpack plan
    pub plan: PathBuf,
}
