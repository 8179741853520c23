//! Build: contribute the solc layer and the launch configuration

use crate::config::{self, BuildpackDescriptor, ConfigResolver};
use crate::dependency::{ArtifactSource, DependencyCache, DependencyResolver};
use crate::env::Environment;
use crate::error::BuildpackResult;
use crate::layer::{DependencyLayerContributor, Layer, LayerTypes, Layers};
use crate::process::{build_process_types, LaunchConfig, Process};
use crate::sbom::ProvenanceRecorder;
use crate::setup::Executor;
use crate::solc::{SolcBuilder, LAYER_NAME, NODE_DEPENDENCY};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Inputs of a build invocation
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub layers_dir: PathBuf,
    pub buildpack_dir: PathBuf,
    /// Process environment overlaid with platform env
    pub env: Environment,
}

/// What the build contributed
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub layers: Vec<Layer>,
    pub processes: Vec<Process>,
}

impl BuildContext {
    /// Production artifact source: pre-staged `<buildpack>/dependencies`,
    /// falling back to downloads in the system temp dir
    pub fn dependency_cache(&self) -> DependencyCache {
        DependencyCache::new(std::env::temp_dir().join("solc-buildpack-downloads"))
            .with_cache_root(self.buildpack_dir.join("dependencies"))
    }
}

/// Run the build phase
pub async fn build(
    ctx: &BuildContext,
    source: Arc<dyn ArtifactSource>,
    executor: Arc<dyn Executor>,
) -> BuildpackResult<BuildResult> {
    let descriptor =
        BuildpackDescriptor::load(&BuildpackDescriptor::path_in(&ctx.buildpack_dir)).await?;
    println!(
        "{} {}",
        style(&descriptor.buildpack.name).bold(),
        descriptor.buildpack.version
    );

    let resolver = ConfigResolver::new(&descriptor, &ctx.env);
    resolver.log_configuration();

    let stack = ctx.env.get(config::STACK_ID).map(str::to_string);
    let dependency = DependencyResolver::new(&descriptor.metadata.dependencies, stack)
        .resolve(NODE_DEPENDENCY, &resolver.value(config::NODE_VERSION))?;

    let layers = Layers::new(&ctx.layers_dir);
    let layer = layers.layer(LAYER_NAME).await?;

    let contributor = DependencyLayerContributor::new(dependency, LayerTypes::ALL, source);
    let builder = SolcBuilder::new(
        executor,
        ctx.env.clone(),
        ProvenanceRecorder::new(&descriptor.buildpack.id),
    );
    let layer = contributor.contribute(layer, &builder).await?;

    let processes = build_process_types(&resolver.value(config::ENABLE_PROCESS));
    let launch = LaunchConfig {
        processes: processes.clone(),
    };
    launch.write(layers.path()).await?;

    info!(
        "Contributed layer {} with {} launch process(es)",
        layer.name,
        processes.len()
    );
    Ok(BuildResult {
        layers: vec![layer],
        processes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Dependency;
    use crate::error::BuildpackError;
    use crate::extract::tests::node_tarball;
    use crate::layer::SbomFormat;
    use crate::setup::tests::ScriptedExecutor;
    use async_trait::async_trait;
    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    struct Workspace {
        _dir: TempDir,
        ctx: BuildContext,
    }

    fn workspace(enable_process: Option<&str>) -> Workspace {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for sub in ["layers", "buildpack", "artifacts", "downloads"] {
            std::fs::create_dir(root.join(sub)).unwrap();
        }

        let archive = root.join("artifacts/node-v20.10.0-linux-x64.tar.gz");
        node_tarball(&archive);
        let sha256 = hex::encode(Sha256::digest(std::fs::read(&archive).unwrap()));

        let buildpack_toml = format!(
            r#"
api = "0.8"

[buildpack]
id = "amp-buildpacks/solc"
name = "AMP Buildpack for Solc"
version = "0.2.1"

[[metadata.configurations]]
name = "BP_ENABLE_SOLC_PROCESS"
default = "false"
build = true

[[metadata.dependencies]]
id = "node"
name = "Node.js"
version = "20.10.0"
uri = "file://{}"
sha256 = "{}"
stacks = ["*"]
strip-components = 1
"#,
            archive.display(),
            sha256
        );
        std::fs::write(root.join("buildpack/buildpack.toml"), buildpack_toml).unwrap();

        let mut env: Environment = [("PATH", "/usr/bin:/bin")].into_iter().collect();
        if let Some(value) = enable_process {
            env.set(config::ENABLE_PROCESS, value);
        }

        let ctx = BuildContext {
            layers_dir: root.join("layers"),
            buildpack_dir: root.join("buildpack"),
            env,
        };
        Workspace { _dir: dir, ctx }
    }

    fn source(ws: &Workspace) -> Arc<dyn ArtifactSource> {
        let downloads = ws.ctx.layers_dir.parent().unwrap().join("downloads");
        Arc::new(DependencyCache::new(downloads))
    }

    fn solc_executor(version: &str) -> Arc<ScriptedExecutor> {
        Arc::new(ScriptedExecutor::new(vec![
            Ok("added 9 packages".to_string()),
            Ok(format!("{version}\n")),
        ]))
    }

    #[tokio::test]
    async fn first_build_then_cache_hit() {
        let ws = workspace(None);

        let executor = solc_executor("0.8.20");
        let result = build(&ws.ctx, source(&ws), executor.clone()).await.unwrap();
        let layer = &result.layers[0];

        assert_eq!(executor.calls().len(), 2);
        assert_eq!(layer.metadata.as_ref().unwrap().version, "20.10.0");
        assert!(layer.path.join("bin/node").is_file());
        assert!(result.processes.is_empty());

        let sbom = std::fs::read_to_string(layer.sbom_path(SbomFormat::SyftJson)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&sbom).unwrap();
        assert_eq!(json["artifacts"][0]["version"], "0.8.20");

        let again = solc_executor("0.8.21");
        let second = build(&ws.ctx, source(&ws), again.clone()).await.unwrap();

        assert!(again.calls().is_empty());
        assert_eq!(&second.layers[0], layer);
    }

    #[tokio::test]
    async fn process_flag_writes_launch_toml() {
        let ws = workspace(Some("true"));

        let result = build(&ws.ctx, source(&ws), solc_executor("0.8.20"))
            .await
            .unwrap();

        assert_eq!(result.processes.len(), 1);
        assert!(result.processes[0].default);
        assert!(LaunchConfig::path_in(&ws.ctx.layers_dir).exists());
    }

    struct NeverSource;

    #[async_trait]
    impl ArtifactSource for NeverSource {
        async fn artifact(&self, dependency: &Dependency) -> BuildpackResult<PathBuf> {
            Err(BuildpackError::DownloadFailed {
                uri: dependency.uri.clone(),
                reason: "offline".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn setup_failure_leaves_no_metadata() {
        let ws = workspace(None);
        let executor = Arc::new(ScriptedExecutor::new(vec![Err(
            BuildpackError::setup_failed("npm install solc -g", "npm ERR! 503", "exit status: 1"),
        )]));

        let err = build(&ws.ctx, source(&ws), executor).await.unwrap_err();

        assert_eq!(err.step(), "setup");
        assert!(!ws.ctx.layers_dir.join("solc.toml").exists());
        assert!(!ws.ctx.layers_dir.join("solc.sbom.syft.json").exists());
    }

    #[tokio::test]
    async fn sbom_failure_records_nothing() {
        let ws = workspace(None);
        std::fs::create_dir(ws.ctx.layers_dir.join("solc.sbom.syft.json")).unwrap();

        let err = build(&ws.ctx, source(&ws), solc_executor("0.8.20"))
            .await
            .unwrap_err();

        assert!(matches!(err, BuildpackError::ProvenanceWriteFailed { .. }));
        assert!(!ws.ctx.layers_dir.join("solc.toml").exists());
    }

    #[tokio::test]
    async fn sbom_failure_on_rebuild_keeps_previous_layer() {
        let ws = workspace(None);
        build(&ws.ctx, source(&ws), solc_executor("0.8.20"))
            .await
            .unwrap();

        let record = ws.ctx.layers_dir.join("solc.toml");
        let record_before = std::fs::read(&record).unwrap();

        // Same archive under a new version forces a rebuild
        let descriptor = BuildpackDescriptor::path_in(&ws.ctx.buildpack_dir);
        let content = std::fs::read_to_string(&descriptor)
            .unwrap()
            .replace("version = \"20.10.0\"", "version = \"20.10.1\"");
        std::fs::write(&descriptor, content).unwrap();

        let sbom = ws.ctx.layers_dir.join("solc.sbom.syft.json");
        std::fs::remove_file(&sbom).unwrap();
        std::fs::create_dir(&sbom).unwrap();

        let executor = solc_executor("0.8.21");
        let err = build(&ws.ctx, source(&ws), executor.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, BuildpackError::ProvenanceWriteFailed { .. }));
        assert_eq!(executor.calls().len(), 2);
        assert_eq!(std::fs::read(&record).unwrap(), record_before);
        assert!(ws.ctx.layers_dir.join("solc/bin/node").is_file());
    }

    #[tokio::test]
    async fn fetch_failure_is_reported() {
        let ws = workspace(None);
        let err = build(&ws.ctx, Arc::new(NeverSource), solc_executor("0.8.20"))
            .await
            .unwrap_err();

        assert!(matches!(err, BuildpackError::DownloadFailed { .. }));
        assert!(!ws.ctx.layers_dir.join("solc.toml").exists());
    }

    #[tokio::test]
    async fn version_constraint_without_match() {
        let mut ws = workspace(None);
        ws.ctx.env.set(config::NODE_VERSION, "18.*");

        let err = build(&ws.ctx, source(&ws), solc_executor("0.8.20"))
            .await
            .unwrap_err();

        assert!(matches!(err, BuildpackError::DependencyNotFound { .. }));
    }
}
