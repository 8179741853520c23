//! Solidity compiler layer
//!
//! Expands the Node.js distribution into the layer, installs `solc`
//! globally with the layer's own `npm`, then asks the installed compiler
//! for its version. That self-reported version, not the Node.js
//! descriptor's, is what goes into the SBOM.

use crate::dependency::Dependency;
use crate::env::Environment;
use crate::error::{BuildpackError, BuildpackResult};
use crate::extract::extract;
use crate::layer::{Layer, LayerBuilder};
use crate::sbom::ProvenanceRecorder;
use crate::setup::{Execution, Executor};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Name of the layer this buildpack contributes
pub const LAYER_NAME: &str = "solc";

/// Dependency id of the Node.js distribution solc is installed with
pub const NODE_DEPENDENCY: &str = "node";

/// Rebuilds the solc layer
pub struct SolcBuilder {
    executor: Arc<dyn Executor>,
    env: Environment,
    recorder: ProvenanceRecorder,
}

impl SolcBuilder {
    /// `env` is the base environment setup actions run in
    pub fn new(executor: Arc<dyn Executor>, env: Environment, recorder: ProvenanceRecorder) -> Self {
        Self {
            executor,
            env,
            recorder,
        }
    }
}

#[async_trait]
impl LayerBuilder for SolcBuilder {
    async fn build(
        &self,
        dependency: &Dependency,
        artifact: &Path,
        layer: &Layer,
    ) -> BuildpackResult<()> {
        let bin = layer.bin_dir();

        info!("Expanding {} to {}", artifact.display(), layer.path.display());
        extract(artifact, &layer.path, dependency.strip_components).await?;

        info!("Setting {} in PATH", bin.display());
        let mut env = self.env.clone();
        env.append_path("PATH", &bin)?;

        let npm = bin.join("npm");
        let install = Execution::new(npm.display().to_string(), ["install", "solc", "-g"])
            .with_env(&env)
            .in_dir(&layer.path);
        self.executor.execute(&install).await?;

        let query = Execution::new("solcjs", ["--version"]).with_env(&env);
        let output = self.executor.execute(&query).await?;
        let version = output.trim();
        if version.is_empty() {
            return Err(BuildpackError::setup_failed(
                query.to_string(),
                output.clone(),
                "no version reported",
            ));
        }
        info!("Checking solc version: {}", version);

        self.recorder.record(layer, version).await?;
        Ok(())
    }
}
