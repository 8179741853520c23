//! Persisted layer records (`<layers>/<name>.toml`)
//!
//! The record is the durability boundary of a contribution: it is written
//! last, to a temporary sibling that is renamed into place, so a build
//! that fails part-way never leaves a record describing a half-built layer.

use crate::dependency::Dependency;
use crate::error::{BuildpackError, BuildpackResult};
use crate::layer::{Layer, LayerTypes};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Contents of `<layers>/<name>.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRecord {
    #[serde(default)]
    pub types: LayerTypes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Dependency>,
}

impl From<&Layer> for LayerRecord {
    fn from(layer: &Layer) -> Self {
        Self {
            types: layer.types,
            metadata: layer.metadata.clone(),
        }
    }
}

impl LayerRecord {
    /// Load a record.
    ///
    /// Returns `None` when the file is missing. A record that cannot be
    /// parsed is also `None`: the layer is treated as never contributed.
    pub async fn read(path: &Path) -> BuildpackResult<Option<Self>> {
        let present = fs::try_exists(path)
            .await
            .map_err(|e| BuildpackError::io(format!("checking {}", path.display()), e))?;
        if !present {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| BuildpackError::io(format!("reading {}", path.display()), e))?;

        match toml::from_str::<LayerRecord>(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Ignoring unreadable layer metadata {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Write the record atomically
    pub async fn write(&self, path: &Path) -> BuildpackResult<()> {
        let failed = |reason: String| BuildpackError::MetadataWriteFailed {
            path: path.to_path_buf(),
            reason,
        };

        let content = toml::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;

        let tmp = path.with_extension(format!("toml.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp, content)
            .await
            .map_err(|e| failed(e.to_string()))?;

        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(failed(e.to_string()));
        }

        debug!("Wrote layer metadata {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::test_dependency;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_record_is_none() {
        let dir = TempDir::new().unwrap();
        let record = LayerRecord::read(&dir.path().join("solc.toml")).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solc.toml");
        let record = LayerRecord {
            types: LayerTypes::ALL,
            metadata: Some(test_dependency("20.10.0", "3fe4aa")),
        };

        record.write(&path).await.unwrap();
        let loaded = LayerRecord::read(&path).await.unwrap().unwrap();

        assert_eq!(loaded, record);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[types]"));
        assert!(content.contains("strip-components = 1"));

        // Only the record remains, no temporary files
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn corrupt_record_is_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solc.toml");
        std::fs::write(&path, "[metadata]\nid = [").unwrap();

        assert!(LayerRecord::read(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("solc.toml");

        let err = LayerRecord::default().write(&path).await.unwrap_err();
        assert!(matches!(err, BuildpackError::MetadataWriteFailed { .. }));
    }
}
