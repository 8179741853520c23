//! Layer SBOM in Syft JSON format
//!
//! One artifact entry per contributed tool, written next to the layer as
//! `<name>.sbom.syft.json` where image scanners pick it up.

use crate::error::{BuildpackError, BuildpackResult};
use crate::layer::{Layer, SbomFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const SYFT_NAME: &str = "syft";
const SYFT_VERSION: &str = "0.32.0";
const SCHEMA_VERSION: &str = "1.1.0";
const SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/anchore/syft/main/schema/json/schema-1.1.0.json";

/// Syft SBOM document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftDocument {
    pub artifacts: Vec<SyftArtifact>,
    pub source: SyftSource,
    pub descriptor: SyftDescriptor,
    pub schema: SyftSchema,
}

/// A single component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyftArtifact {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub found_by: String,
    pub locations: Vec<SyftLocation>,
    pub licenses: Vec<String>,
    pub language: String,
    pub cpes: Vec<String>,
    pub purl: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftLocation {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftDescriptor {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftSchema {
    pub version: String,
    pub url: String,
}

impl SyftDocument {
    /// Document describing `artifacts` found in the directory `target`
    pub fn for_directory(target: &Path, artifacts: Vec<SyftArtifact>) -> Self {
        Self {
            artifacts,
            source: SyftSource {
                kind: "directory".to_string(),
                target: target.display().to_string(),
            },
            descriptor: SyftDescriptor {
                name: SYFT_NAME.to_string(),
                version: SYFT_VERSION.to_string(),
            },
            schema: SyftSchema {
                version: SCHEMA_VERSION.to_string(),
                url: SCHEMA_URL.to_string(),
            },
        }
    }
}

/// Builds and writes the SBOM for the installed Solidity compiler
#[derive(Debug, Clone)]
pub struct ProvenanceRecorder {
    found_by: String,
}

impl ProvenanceRecorder {
    /// `found_by` is the id of the buildpack doing the install
    pub fn new(found_by: impl Into<String>) -> Self {
        Self {
            found_by: found_by.into(),
        }
    }

    /// The artifact entry for `solc` at the version the tool reported
    pub fn solc_artifact(&self, version: &str) -> SyftArtifact {
        SyftArtifact {
            id: "solc".to_string(),
            name: "Solc".to_string(),
            version: version.to_string(),
            kind: "UnknownPackage".to_string(),
            found_by: self.found_by.clone(),
            // Buildpack id and the layer the tool is installed in
            locations: vec![SyftLocation {
                path: format!("{}/solc", self.found_by),
            }],
            licenses: vec!["Apache-2.0".to_string()],
            language: String::new(),
            cpes: vec![format!("cpe:2.3:a:solc:solc:{}:*:*:*:*:*:*:*", version)],
            purl: format!("pkg:generic/solc@{}", version),
        }
    }

    /// Write the SBOM for `layer`, returning the file written.
    ///
    /// Any failure is `ProvenanceWriteFailed`; the contribution must not
    /// be recorded without it.
    pub async fn record(&self, layer: &Layer, version: &str) -> BuildpackResult<PathBuf> {
        let path = layer.sbom_path(SbomFormat::SyftJson);
        let failed = |reason: String| BuildpackError::ProvenanceWriteFailed {
            path: path.clone(),
            reason,
        };

        let document = SyftDocument::for_directory(&layer.path, vec![self.solc_artifact(version)]);
        debug!("Writing Syft SBOM at {}: {:?}", path.display(), document);

        let content = serde_json::to_string_pretty(&document).map_err(|e| failed(e.to_string()))?;
        fs::write(&path, content)
            .await
            .map_err(|e| failed(e.to_string()))?;

        Ok(path)
    }
}
