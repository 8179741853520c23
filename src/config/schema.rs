//! Buildpack descriptor schema
//!
//! Mirrors the parts of `buildpack.toml` this buildpack reads: identity,
//! configuration defaults and the dependency catalogue.

use crate::dependency::Dependency;
use serde::{Deserialize, Serialize};

/// Root of `buildpack.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildpackDescriptor {
    /// Buildpack API version
    pub api: String,

    /// Buildpack identity
    pub buildpack: BuildpackInfo,

    /// Buildpack-specific metadata
    pub metadata: BuildpackMetadata,
}

/// `[buildpack]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildpackInfo {
    pub id: String,
    pub name: String,
    pub version: String,
}

impl Default for BuildpackInfo {
    fn default() -> Self {
        Self {
            id: "amp-buildpacks/solc".to_string(),
            name: "AMP Buildpack for Solc".to_string(),
            version: "0.0.0".to_string(),
        }
    }
}

/// `[metadata]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildpackMetadata {
    /// Declared configuration options with defaults
    pub configurations: Vec<Configuration>,

    /// Dependency catalogue
    pub dependencies: Vec<Dependency>,
}

/// One `[[metadata.configurations]]` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Environment variable name
    pub name: String,

    /// Default value when the variable is unset
    pub default: String,

    /// Human-readable description
    pub description: String,

    /// Read at build time
    pub build: bool,

    /// Read at launch time
    pub launch: bool,
}
