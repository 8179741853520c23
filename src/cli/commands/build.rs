//! Build command - contribute the solc layer

use crate::build::{build, BuildContext};
use crate::cli::args::BuildArgs;
use crate::env::Environment;
use crate::error::BuildpackResult;
use crate::setup::CommandExecutor;
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Execute the build phase
pub async fn execute(args: BuildArgs, buildpack_dir: &Path) -> BuildpackResult<()> {
    debug!("Buildpack plan: {}", args.plan.display());

    let env = Environment::from_process()
        .with_platform(&args.platform)
        .await?;

    let ctx = BuildContext {
        layers_dir: args.layers,
        buildpack_dir: buildpack_dir.to_path_buf(),
        env,
    };

    let source = Arc::new(ctx.dependency_cache());
    let result = build(&ctx, source, Arc::new(CommandExecutor::new())).await?;

    for layer in &result.layers {
        println!(
            "{} Layer {} ready at {}",
            style("✓").green(),
            style(&layer.name).cyan(),
            layer.path.display()
        );
    }
    for process in &result.processes {
        println!(
            "  Process {}: {}{}",
            style(&process.kind).cyan(),
            process.command,
            if process.default { " (default)" } else { "" }
        );
    }

    Ok(())
}
