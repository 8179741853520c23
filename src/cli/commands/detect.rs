//! Detect command - decide whether the buildpack applies

use crate::cli::args::DetectArgs;
use crate::detect::{detect, BuildPlan};
use crate::error::{BuildpackError, BuildpackResult};
use console::style;

/// Execute the detect phase; `Ok(false)` means the buildpack does not apply
pub async fn execute(args: DetectArgs) -> BuildpackResult<bool> {
    let app_dir = match args.app {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|e| BuildpackError::io("getting current directory", e))?,
    };

    if !detect(&app_dir).await? {
        println!("{} No Solidity sources found", style("SKIP:").yellow());
        return Ok(false);
    }

    BuildPlan::solc().write(&args.plan).await?;
    println!("{} Solidity sources found", style("PASS:").green());
    Ok(true)
}
