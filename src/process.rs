//! Launch processes for the application image

use crate::error::{BuildpackError, BuildpackResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// A launchable process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    #[serde(rename = "type")]
    pub kind: String,
    pub command: String,
    #[serde(default)]
    pub default: bool,
}

/// Processes for the image: a default `web` process running `npm start`
/// when `enable` is exactly `"true"`, otherwise none.
pub fn build_process_types(enable: &str) -> Vec<Process> {
    let mut processes = Vec::new();

    if enable == "true" {
        processes.push(Process {
            kind: "web".to_string(),
            command: "npm start".to_string(),
            default: true,
        });
    }

    processes
}

/// Contents of `<layers>/launch.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default)]
    pub processes: Vec<Process>,
}

impl LaunchConfig {
    pub fn path_in(layers_dir: &Path) -> PathBuf {
        layers_dir.join("launch.toml")
    }

    /// Write `launch.toml`; nothing is written when there are no processes
    pub async fn write(&self, layers_dir: &Path) -> BuildpackResult<()> {
        if self.processes.is_empty() {
            debug!("No launch processes to write");
            return Ok(());
        }

        let path = Self::path_in(layers_dir);
        let content = toml::to_string(self)?;
        fs::write(&path, content)
            .await
            .map_err(|e| BuildpackError::io(format!("writing {}", path.display()), e))?;
        debug!("Wrote {} launch processes to {}", self.processes.len(), path.display());
        Ok(())
    }
}
