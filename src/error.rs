//! Error types for the solc buildpack
//!
//! All modules use `BuildpackResult<T>` as their return type. Every
//! variant is fatal to the current build; nothing is retried internally.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildpack operations
pub type BuildpackResult<T> = Result<T, BuildpackError>;

/// All errors that can occur while detecting or building
#[derive(Error, Debug)]
pub enum BuildpackError {
    // Layer contribution errors
    #[error("Unable to expand {archive}: {reason}")]
    ExtractionFailed { archive: PathBuf, reason: String },

    #[error("Unable to set ${variable}: {reason}")]
    EnvironmentUpdateFailed { variable: String, reason: String },

    #[error("Error executing '{command}': {reason}\nCombined Output:\n{output}")]
    SetupActionFailed {
        command: String,
        output: String,
        reason: String,
    },

    #[error("Unable to write SBOM {path}: {reason}")]
    ProvenanceWriteFailed { path: PathBuf, reason: String },

    #[error("Unable to write layer metadata {path}: {reason}")]
    MetadataWriteFailed { path: PathBuf, reason: String },

    // Dependency errors
    #[error("No dependency found for {id} matching version '{version}' on stack '{stack}'")]
    DependencyNotFound {
        id: String,
        version: String,
        stack: String,
    },

    #[error("Invalid version constraint '{constraint}': {reason}")]
    InvalidVersion { constraint: String, reason: String },

    #[error("Checksum mismatch for {path}: expected sha256 {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Unable to download {uri}: {reason}")]
    DownloadFailed { uri: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BuildpackError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a setup action failure carrying the combined output
    pub fn setup_failed(
        command: impl Into<String>,
        output: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SetupActionFailed {
            command: command.into(),
            output: output.into(),
            reason: reason.into(),
        }
    }

    /// Create an extraction failure
    pub fn extraction(archive: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ExtractionFailed {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }

    /// Name of the failing build step, for log output
    pub fn step(&self) -> &'static str {
        match self {
            Self::ExtractionFailed { .. } => "extract",
            Self::EnvironmentUpdateFailed { .. } => "environment",
            Self::SetupActionFailed { .. } => "setup",
            Self::ProvenanceWriteFailed { .. } => "sbom",
            Self::MetadataWriteFailed { .. } => "metadata",
            Self::DependencyNotFound { .. }
            | Self::ChecksumMismatch { .. }
            | Self::DownloadFailed { .. } => "fetch",
            Self::ConfigInvalid { .. } | Self::InvalidVersion { .. } | Self::TomlParse(_) => {
                "config"
            }
            _ => "build",
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::DependencyNotFound { .. } => {
                Some("Check BP_NODE_VERSION against the dependencies in buildpack.toml")
            }
            Self::ChecksumMismatch { .. } => {
                Some("Remove the cached artifact or fix the sha256 in buildpack.toml")
            }
            Self::SetupActionFailed { .. } => Some("Re-run the build with BP_LOG_LEVEL=DEBUG"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_failure_includes_output() {
        let err = BuildpackError::setup_failed("npm", "ERR! network", "exit status: 1");
        let msg = err.to_string();
        assert!(msg.contains("'npm'"));
        assert!(msg.contains("ERR! network"));
        assert!(msg.contains("exit status: 1"));
    }

    #[test]
    fn steps_are_distinguished() {
        let extract = BuildpackError::extraction("/tmp/node.tar.gz", "bad header");
        let setup = BuildpackError::setup_failed("npm", "", "exit status: 1");
        let sbom = BuildpackError::ProvenanceWriteFailed {
            path: PathBuf::from("/layers/solc.sbom.syft.json"),
            reason: "read-only".to_string(),
        };

        assert_eq!(extract.step(), "extract");
        assert_eq!(setup.step(), "setup");
        assert_eq!(sbom.step(), "sbom");
        assert!(extract.to_string().starts_with("Unable to expand"));
        assert!(sbom.to_string().starts_with("Unable to write SBOM"));
    }

    #[test]
    fn error_hint() {
        let err = BuildpackError::DependencyNotFound {
            id: "node".to_string(),
            version: "99.*".to_string(),
            stack: "*".to_string(),
        };
        assert!(err.hint().unwrap().contains("BP_NODE_VERSION"));
        assert!(BuildpackError::Internal("x".to_string()).hint().is_none());
    }
}
