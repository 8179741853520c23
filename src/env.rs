//! Explicit environment map for setup actions
//!
//! Build steps never touch the process environment. Variables are
//! collected once into an `Environment` and threaded through every
//! `Execution` that needs them.

use crate::error::{BuildpackError, BuildpackResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// An ordered set of environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment, skipping non-UTF-8 entries
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Overlay variables from a CNB platform directory.
    ///
    /// Each file in `<platform>/env/` is a variable named after the file
    /// with the file contents as value. A missing directory is not an error.
    pub async fn with_platform(mut self, platform_dir: &Path) -> BuildpackResult<Self> {
        let env_dir = platform_dir.join("env");
        if !env_dir.is_dir() {
            return Ok(self);
        }

        let mut entries = fs::read_dir(&env_dir)
            .await
            .map_err(|e| BuildpackError::io(format!("reading {}", env_dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BuildpackError::io("reading platform env entry", e))?
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let value = fs::read_to_string(&path)
                .await
                .map_err(|e| BuildpackError::io(format!("reading {}", path.display()), e))?;
            debug!("Platform env {} loaded", name);
            self.vars.insert(name.to_string(), value);
        }

        Ok(self)
    }

    /// Look up a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set a variable, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Append a directory to a search-path style variable (e.g. `PATH`).
    ///
    /// Fails with `EnvironmentUpdateFailed` when the directory cannot be
    /// represented in the variable (non-UTF-8 or contains the separator).
    pub fn append_path(&mut self, key: &str, dir: &Path) -> BuildpackResult<()> {
        let mut paths: Vec<PathBuf> = self
            .get(key)
            .map(|current| std::env::split_paths(current).collect())
            .unwrap_or_default();
        paths.push(dir.to_path_buf());

        let joined = std::env::join_paths(paths).map_err(|e| {
            BuildpackError::EnvironmentUpdateFailed {
                variable: key.to_string(),
                reason: e.to_string(),
            }
        })?;
        let value = joined
            .into_string()
            .map_err(|_| BuildpackError::EnvironmentUpdateFailed {
                variable: key.to_string(),
                reason: format!("{} is not valid UTF-8", dir.display()),
            })?;

        debug!("Setting ${} to {}", key, value);
        self.vars.insert(key.to_string(), value);
        Ok(())
    }

    /// Iterate variables in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_path_to_existing() {
        let mut env: Environment = [("PATH", "/usr/bin:/bin")].into_iter().collect();
        env.append_path("PATH", Path::new("/layers/solc/bin")).unwrap();

        assert_eq!(env.get("PATH"), Some("/usr/bin:/bin:/layers/solc/bin"));
    }

    #[test]
    fn append_path_when_unset() {
        let mut env = Environment::new();
        env.append_path("PATH", Path::new("/layers/solc/bin")).unwrap();

        assert_eq!(env.get("PATH"), Some("/layers/solc/bin"));
    }

    #[cfg(unix)]
    #[test]
    fn append_path_rejects_separator() {
        let mut env: Environment = [("PATH", "/usr/bin")].into_iter().collect();
        let err = env
            .append_path("PATH", Path::new("/layers/bad:dir"))
            .unwrap_err();

        assert!(matches!(err, BuildpackError::EnvironmentUpdateFailed { .. }));
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
    }

    #[tokio::test]
    async fn platform_env_overrides() {
        let platform = TempDir::new().unwrap();
        std::fs::create_dir(platform.path().join("env")).unwrap();
        std::fs::write(platform.path().join("env/BP_ENABLE_SOLC_PROCESS"), "true").unwrap();

        let env: Environment = [("BP_ENABLE_SOLC_PROCESS", "false"), ("HOME", "/home/cnb")]
            .into_iter()
            .collect();
        let env = env.with_platform(platform.path()).await.unwrap();

        assert_eq!(env.get("BP_ENABLE_SOLC_PROCESS"), Some("true"));
        assert_eq!(env.get("HOME"), Some("/home/cnb"));
    }

    #[test]
    #[serial_test::serial]
    fn from_process_snapshots_variables() {
        std::env::set_var("SOLC_BUILDPACK_SNAPSHOT", "1");
        let env = Environment::from_process();
        std::env::remove_var("SOLC_BUILDPACK_SNAPSHOT");

        assert_eq!(env.get("SOLC_BUILDPACK_SNAPSHOT"), Some("1"));
    }

    #[tokio::test]
    async fn missing_platform_dir_is_ignored() {
        let platform = TempDir::new().unwrap();
        let env = Environment::new().with_platform(platform.path()).await.unwrap();
        assert_eq!(env.iter().count(), 0);
    }
}
