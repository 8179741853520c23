//! Configuration management for the solc buildpack
//!
//! Defaults come from `buildpack.toml`; values resolve from the build
//! environment (process env overlaid with platform env files).

pub mod schema;

pub use schema::{BuildpackDescriptor, Configuration};

use crate::env::Environment;
use crate::error::{BuildpackError, BuildpackResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Enables the default `web` launch process when `"true"`
pub const ENABLE_PROCESS: &str = "BP_ENABLE_SOLC_PROCESS";

/// Semver constraint for the node dependency
pub const NODE_VERSION: &str = "BP_NODE_VERSION";

/// `DEBUG` turns on debug logging
pub const LOG_LEVEL: &str = "BP_LOG_LEVEL";

/// Stack the build runs on
pub const STACK_ID: &str = "CNB_STACK_ID";

impl BuildpackDescriptor {
    /// Path of the descriptor inside a buildpack directory
    pub fn path_in(buildpack_dir: &Path) -> PathBuf {
        buildpack_dir.join("buildpack.toml")
    }

    /// Load the descriptor from a file
    pub async fn load(path: &Path) -> BuildpackResult<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| BuildpackError::io(format!("reading {}", path.display()), e))?;

        let descriptor = Self::parse(&content).map_err(|e| BuildpackError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(
            "Loaded {} {} with {} dependencies",
            descriptor.buildpack.id,
            descriptor.buildpack.version,
            descriptor.metadata.dependencies.len()
        );
        Ok(descriptor)
    }

    /// Parse the descriptor from a TOML string
    pub fn parse(content: &str) -> BuildpackResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Resolves configuration values against declared defaults
pub struct ConfigResolver<'a> {
    configurations: &'a [Configuration],
    env: &'a Environment,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(descriptor: &'a BuildpackDescriptor, env: &'a Environment) -> Self {
        Self {
            configurations: &descriptor.metadata.configurations,
            env,
        }
    }

    /// Resolve a value; the flag is `true` when it was explicitly set
    pub fn resolve(&self, name: &str) -> (String, bool) {
        if let Some(value) = self.env.get(name) {
            return (value.to_string(), true);
        }

        let default = self
            .configurations
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.default.clone())
            .unwrap_or_default();
        (default, false)
    }

    /// Resolve a value, ignoring where it came from
    pub fn value(&self, name: &str) -> String {
        self.resolve(name).0
    }

    /// Log every build-time configuration with its effective value
    pub fn log_configuration(&self) {
        for config in self.configurations.iter().filter(|c| c.build) {
            let (value, set) = self.resolve(&config.name);
            let origin = if set { "set" } else { "default" };
            debug!("{}={} ({}) {}", config.name, value, origin, config.description);
        }
    }
}
