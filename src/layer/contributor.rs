//! Dependency layer contribution
//!
//! Decides whether a layer can be reused for a dependency and, if not,
//! rebuilds it exactly once.
//!
//! | Stored metadata | Action |
//! |-----------------|--------|
//! | absent | fetch, set aside, build, record |
//! | different cache key | fetch, set aside, build, record |
//! | same cache key | reuse, nothing written |
//!
//! Previous contents are moved to a sibling backup while the builder runs.
//! If the build or the record write fails they are moved back, so the
//! record on disk always describes the directory next to it.

use crate::dependency::{ArtifactSource, Dependency};
use crate::error::BuildpackResult;
use crate::layer::{Layer, LayerRecord, LayerTypes};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Populates an empty layer directory from a fetched artifact
#[async_trait]
pub trait LayerBuilder: Send + Sync {
    /// Build the layer contents for `dependency`; `artifact` is its
    /// checksum-verified download
    async fn build(
        &self,
        dependency: &Dependency,
        artifact: &Path,
        layer: &Layer,
    ) -> BuildpackResult<()>;
}

/// Contributes a single dependency into a layer
pub struct DependencyLayerContributor {
    dependency: Dependency,
    types: LayerTypes,
    source: Arc<dyn ArtifactSource>,
}

impl DependencyLayerContributor {
    pub fn new(dependency: Dependency, types: LayerTypes, source: Arc<dyn ArtifactSource>) -> Self {
        Self {
            dependency,
            types,
            source,
        }
    }

    /// Whether `layer` already holds this contributor's dependency
    pub fn is_cached(&self, layer: &Layer) -> bool {
        layer
            .metadata
            .as_ref()
            .is_some_and(|existing| existing.is_equivalent(&self.dependency))
    }

    /// Contribute the dependency into `layer`.
    ///
    /// On a cache hit `layer` is returned unchanged without touching the
    /// filesystem. On a miss the artifact is fetched, `builder` runs once
    /// in an emptied layer directory, and the new record is persisted.
    /// Any failure leaves both the record and the previous contents as
    /// they were.
    pub async fn contribute(
        &self,
        layer: Layer,
        builder: &dyn LayerBuilder,
    ) -> BuildpackResult<Layer> {
        let key = self.dependency.cache_key();

        if self.is_cached(&layer) {
            info!("Reusing cached layer {}", layer.path.display());
            return Ok(layer);
        }

        match &layer.metadata {
            Some(existing) => debug!("Dependency changed: {} -> {}", existing.cache_key(), key),
            None => debug!("No previous contribution for {}", key),
        }

        info!(
            "Contributing {} {} to layer {}",
            self.dependency.name, self.dependency.version, layer.name
        );

        let artifact = self.source.artifact(&self.dependency).await?;
        let backup = layer.set_aside().await?;

        let mut built = layer.clone();
        built.types = self.types;
        built.metadata = Some(self.dependency.clone());

        let result = match builder.build(&self.dependency, &artifact, &built).await {
            Ok(()) => LayerRecord::from(&built).write(&built.metadata_path()).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            if let Err(restore) = layer.restore(&backup).await {
                warn!("Unable to restore layer {}: {}", layer.name, restore);
            }
            return Err(e);
        }

        if let Err(e) = layer.discard_backup(&backup).await {
            warn!("Unable to remove previous contents of {}: {}", layer.name, e);
        }
        Ok(built)
    }
}
