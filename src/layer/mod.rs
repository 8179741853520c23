//! Buildpack layers
//!
//! A layer is a directory under the CNB layers root plus a sibling
//! `<name>.toml` recording its types and the dependency last contributed
//! into it. Layers are reused across builds only through that record.

pub mod contributor;
pub mod metadata;

pub use contributor::{DependencyLayerContributor, LayerBuilder};
pub use metadata::LayerRecord;

use crate::dependency::Dependency;
use crate::error::{BuildpackError, BuildpackResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// When the layer is visible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerTypes {
    /// Available to subsequent buildpacks
    pub build: bool,
    /// Restored from cache on the next build
    pub cache: bool,
    /// Exported into the application image
    pub launch: bool,
}

impl LayerTypes {
    /// Visible at build, cache and launch time
    pub const ALL: Self = Self {
        build: true,
        cache: true,
        launch: true,
    };
}

/// SBOM formats a layer can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbomFormat {
    SyftJson,
}

impl SbomFormat {
    /// File extension used in `<layer>.sbom.<ext>`
    pub fn extension(&self) -> &'static str {
        match self {
            Self::SyftJson => "syft.json",
        }
    }
}

/// A single layer and its last persisted state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    /// Layer name (directory name under the layers root)
    pub name: String,
    /// Directory owned by this layer
    pub path: PathBuf,
    /// Visibility flags
    pub types: LayerTypes,
    /// Dependency last contributed; `None` if never contributed
    pub metadata: Option<Dependency>,
}

impl Layer {
    fn root(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Path of the `<name>.toml` record
    pub fn metadata_path(&self) -> PathBuf {
        self.root().join(format!("{}.toml", self.name))
    }

    /// Path of the layer SBOM in the given format
    pub fn sbom_path(&self, format: SbomFormat) -> PathBuf {
        self.root()
            .join(format!("{}.sbom.{}", self.name, format.extension()))
    }

    /// Executables directory inside the layer
    pub fn bin_dir(&self) -> PathBuf {
        self.path.join("bin")
    }

    /// Move the current contents to a sibling backup and leave an empty
    /// layer directory in their place. Returns the backup path, which does
    /// not exist when the layer had no directory yet.
    pub async fn set_aside(&self) -> BuildpackResult<PathBuf> {
        let backup = self
            .root()
            .join(format!("{}.{}.bak", self.name, uuid::Uuid::new_v4()));

        if exists(&self.path).await? {
            fs::rename(&self.path, &backup).await.map_err(|e| {
                BuildpackError::io(format!("moving layer {} aside", self.path.display()), e)
            })?;
        }
        fs::create_dir_all(&self.path)
            .await
            .map_err(|e| BuildpackError::io(format!("creating layer {}", self.path.display()), e))?;

        debug!("Layer {} set aside at {}", self.name, backup.display());
        Ok(backup)
    }

    /// Put back the contents saved by `set_aside`, dropping whatever a
    /// failed rebuild left in the layer directory
    pub async fn restore(&self, backup: &Path) -> BuildpackResult<()> {
        if exists(&self.path).await? {
            fs::remove_dir_all(&self.path).await.map_err(|e| {
                BuildpackError::io(format!("removing layer {}", self.path.display()), e)
            })?;
        }

        if exists(backup).await? {
            fs::rename(backup, &self.path).await.map_err(|e| {
                BuildpackError::io(format!("restoring layer {}", self.path.display()), e)
            })?;
        } else {
            fs::create_dir_all(&self.path).await.map_err(|e| {
                BuildpackError::io(format!("creating layer {}", self.path.display()), e)
            })?;
        }

        debug!("Layer {} restored", self.name);
        Ok(())
    }

    /// Delete the contents saved by `set_aside` once the rebuild is recorded
    pub async fn discard_backup(&self, backup: &Path) -> BuildpackResult<()> {
        if exists(backup).await? {
            fs::remove_dir_all(backup)
                .await
                .map_err(|e| BuildpackError::io(format!("removing {}", backup.display()), e))?;
        }
        Ok(())
    }
}

async fn exists(path: &Path) -> BuildpackResult<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| BuildpackError::io(format!("checking {}", path.display()), e))
}

/// The CNB layers root handed to the build step
#[derive(Debug, Clone)]
pub struct Layers {
    path: PathBuf,
}

impl Layers {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reserve the named layer directory and load its persisted record
    pub async fn layer(&self, name: &str) -> BuildpackResult<Layer> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(BuildpackError::Internal(format!("invalid layer name '{}'", name)));
        }

        let path = self.path.join(name);
        fs::create_dir_all(&path)
            .await
            .map_err(|e| BuildpackError::io(format!("creating layer {}", path.display()), e))?;

        let mut layer = Layer {
            name: name.to_string(),
            path,
            types: LayerTypes::default(),
            metadata: None,
        };

        if let Some(record) = LayerRecord::read(&layer.metadata_path()).await? {
            layer.types = record.types;
            layer.metadata = record.metadata;
        }
        debug!(
            "Layer {} loaded (previous contribution: {})",
            name,
            layer.metadata.is_some()
        );
        Ok(layer)
    }
}
