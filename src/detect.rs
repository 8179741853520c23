//! Detection: does this buildpack apply to the application?
//!
//! Passes when Solidity sources exist at the application root or under
//! `contracts/`.

use crate::error::{BuildpackError, BuildpackResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Build plan entry name shared by provides and requires
pub const PLAN_ENTRY: &str = "solc";

/// Directories searched for `*.sol` files, relative to the app root
const SOURCE_DIRS: &[&str] = &["", "contracts"];

/// Build plan written on a passing detect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    #[serde(default)]
    pub provides: Vec<PlanEntry>,
    #[serde(default)]
    pub requires: Vec<PlanEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,
}

impl BuildPlan {
    /// Plan providing and requiring `solc`
    pub fn solc() -> Self {
        Self {
            provides: vec![PlanEntry {
                name: PLAN_ENTRY.to_string(),
            }],
            requires: vec![PlanEntry {
                name: PLAN_ENTRY.to_string(),
            }],
        }
    }

    pub async fn write(&self, path: &Path) -> BuildpackResult<()> {
        let content = toml::to_string(self)?;
        fs::write(path, content)
            .await
            .map_err(|e| BuildpackError::io(format!("writing build plan {}", path.display()), e))
    }
}

/// Whether the application contains Solidity sources
pub async fn detect(app_dir: &Path) -> BuildpackResult<bool> {
    for dir in SOURCE_DIRS {
        let dir = app_dir.join(dir);
        if !dir.is_dir() {
            continue;
        }

        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| BuildpackError::io(format!("reading {}", dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BuildpackError::io(format!("reading entry in {}", dir.display()), e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "sol") && path.is_file() {
                debug!("Found Solidity source: {}", path.display());
                return Ok(true);
            }
        }
    }

    debug!("No Solidity sources in {}", app_dir.display());
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn passes_with_root_source() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Token.sol"), "pragma solidity ^0.8.0;").unwrap();
        assert!(detect(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn passes_with_contracts_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("contracts")).unwrap();
        std::fs::write(dir.path().join("contracts/Vault.sol"), "").unwrap();
        assert!(detect(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn fails_without_sources() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::create_dir(dir.path().join("notes.sol")).unwrap();
        assert!(!detect(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn writes_plan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.toml");

        BuildPlan::solc().write(&path).await.unwrap();

        let parsed: BuildPlan = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, BuildPlan::solc());
    }
}
