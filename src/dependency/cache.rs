//! Artifact fetching and verification
//!
//! Artifacts are addressed by their SHA-256 digest:
//!
//! | Location | Layout |
//! |----------|--------|
//! | Pre-staged cache roots | `<root>/<sha256>/<file name>` |
//! | Download root | `<root>/<sha256>/<file name>` |
//!
//! Every artifact handed out has had its digest verified.

use crate::dependency::Dependency;
use crate::error::{BuildpackError, BuildpackResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// Supplies a local, checksum-verified copy of a dependency's artifact
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Return the path of the verified artifact
    async fn artifact(&self, dependency: &Dependency) -> BuildpackResult<PathBuf>;
}

/// Digest-addressed artifact cache with download fallback
#[derive(Debug, Clone)]
pub struct DependencyCache {
    cache_roots: Vec<PathBuf>,
    download_root: PathBuf,
}

impl DependencyCache {
    /// Create a cache that downloads into `download_root`
    pub fn new(download_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_roots: Vec::new(),
            download_root: download_root.into(),
        }
    }

    /// Add a read-only root searched before downloading
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_roots.push(root.into());
        self
    }

    fn location(root: &Path, dependency: &Dependency) -> PathBuf {
        root.join(dependency.sha256.to_ascii_lowercase())
            .join(dependency.artifact_name())
    }

    fn fetch_blocking(&self, dependency: &Dependency) -> BuildpackResult<PathBuf> {
        for root in &self.cache_roots {
            let candidate = Self::location(root, dependency);
            if candidate.is_file() {
                debug!("Found cached artifact {}", candidate.display());
                verify(&candidate, &dependency.sha256)?;
                return Ok(candidate);
            }
        }

        let target = Self::location(&self.download_root, dependency);
        if target.is_file() {
            match verify(&target, &dependency.sha256) {
                Ok(()) => {
                    debug!("Reusing downloaded artifact {}", target.display());
                    return Ok(target);
                }
                Err(e) => {
                    warn!("Discarding previous download: {}", e);
                    fs::remove_file(&target).map_err(|e| {
                        BuildpackError::io(format!("removing {}", target.display()), e)
                    })?;
                }
            }
        }

        info!("Downloading from {}", dependency.uri);
        download(dependency, &target)?;
        Ok(target)
    }
}

#[async_trait]
impl ArtifactSource for DependencyCache {
    async fn artifact(&self, dependency: &Dependency) -> BuildpackResult<PathBuf> {
        let cache = self.clone();
        let dependency = dependency.clone();
        tokio::task::spawn_blocking(move || cache.fetch_blocking(&dependency))
            .await
            .map_err(|e| BuildpackError::Internal(format!("artifact fetch task: {}", e)))?
    }
}

/// Hex SHA-256 of a file's contents
pub fn sha256_file(path: &Path) -> BuildpackResult<String> {
    let mut file = File::open(path)
        .map_err(|e| BuildpackError::io(format!("opening {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| BuildpackError::io(format!("reading {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn verify(path: &Path, expected: &str) -> BuildpackResult<()> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(BuildpackError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_ascii_lowercase(),
            actual,
        })
    }
}

fn open_source(uri: &str) -> BuildpackResult<Box<dyn Read>> {
    if let Some(local) = uri.strip_prefix("file://") {
        let file = File::open(local).map_err(|e| BuildpackError::DownloadFailed {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        return Ok(Box::new(file));
    }

    let response = ureq::get(uri)
        .call()
        .map_err(|e| BuildpackError::DownloadFailed {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
    Ok(Box::new(response.into_body().into_reader()))
}

/// Stream the artifact into `target`, hashing as it is written.
///
/// Data lands in a uniquely named partial file that is renamed only
/// after the digest matches.
fn download(dependency: &Dependency, target: &Path) -> BuildpackResult<()> {
    let dir = target
        .parent()
        .ok_or_else(|| BuildpackError::Internal(format!("no parent for {}", target.display())))?;
    fs::create_dir_all(dir)
        .map_err(|e| BuildpackError::io(format!("creating {}", dir.display()), e))?;

    let partial = dir.join(format!(".{}.partial", uuid::Uuid::new_v4()));
    let result = stream_to(dependency, &partial);

    match result {
        Ok(actual) if actual.eq_ignore_ascii_case(&dependency.sha256) => {
            fs::rename(&partial, target).map_err(|e| {
                BuildpackError::io(format!("moving download to {}", target.display()), e)
            })?;
            debug!("Stored {} ({})", target.display(), actual);
            Ok(())
        }
        Ok(actual) => {
            let _ = fs::remove_file(&partial);
            Err(BuildpackError::ChecksumMismatch {
                path: target.to_path_buf(),
                expected: dependency.sha256.to_ascii_lowercase(),
                actual,
            })
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn stream_to(dependency: &Dependency, partial: &Path) -> BuildpackResult<String> {
    let failed = |reason: String| BuildpackError::DownloadFailed {
        uri: dependency.uri.clone(),
        reason,
    };

    let mut reader = open_source(&dependency.uri)?;
    let mut file = File::create(partial)
        .map_err(|e| BuildpackError::io(format!("creating {}", partial.display()), e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf).map_err(|e| failed(e.to_string()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n])
            .map_err(|e| BuildpackError::io(format!("writing {}", partial.display()), e))?;
    }
    file.flush()
        .map_err(|e| BuildpackError::io(format!("flushing {}", partial.display()), e))?;

    Ok(hex::encode(hasher.finalize()))
}
