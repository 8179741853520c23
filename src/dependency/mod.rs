//! Dependency descriptors
//!
//! A `Dependency` is the immutable description of an artifact to
//! materialize into a layer. Reuse of a layer is decided purely by
//! comparing `CacheKey`s, never by timestamps.

pub mod cache;
pub mod resolver;

pub use cache::{ArtifactSource, DependencyCache};
pub use resolver::DependencyResolver;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A versioned, checksummed external artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Dependency {
    /// Stable identifier (e.g. `node`)
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    /// Nominal version of the artifact
    pub version: String,

    /// Download location
    pub uri: String,

    /// Hex-encoded SHA-256 of the artifact
    pub sha256: String,

    /// Leading path segments to drop on extraction
    #[serde(default)]
    pub strip_components: u32,

    /// Stacks this artifact is built for (`*` = any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stacks: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cpes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<License>,
}

/// License declared for a dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Identity used to decide whether a layer can be reused
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub id: String,
    pub version: String,
    pub sha256: String,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} (sha256:{})", self.id, self.version, self.sha256)
    }
}

impl Dependency {
    /// Cache key over the identity fields; the digest is case-normalized
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            id: self.id.clone(),
            version: self.version.clone(),
            sha256: self.sha256.to_ascii_lowercase(),
        }
    }

    /// Whether a layer built from `other` can serve this dependency
    pub fn is_equivalent(&self, other: &Dependency) -> bool {
        self.cache_key() == other.cache_key()
    }

    /// File name of the artifact, taken from the last URI path segment
    pub fn artifact_name(&self) -> String {
        let without_query = self
            .uri
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        without_query
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty() && !name.contains(':'))
            .unwrap_or("artifact")
            .to_string()
    }

    /// Whether this artifact can be used on the given stack
    pub fn supports_stack(&self, stack: &str) -> bool {
        self.stacks.is_empty() || self.stacks.iter().any(|s| s == "*" || s == stack)
    }
}

#[cfg(test)]
pub(crate) fn test_dependency(version: &str, sha256: &str) -> Dependency {
    Dependency {
        id: "node".to_string(),
        name: "Node.js".to_string(),
        version: version.to_string(),
        uri: format!("https://nodejs.org/dist/v{version}/node-v{version}-linux-x64.tar.gz"),
        sha256: sha256.to_string(),
        strip_components: 1,
        stacks: vec!["*".to_string()],
        cpes: vec![],
        purl: None,
        licenses: vec![],
    }
}
