//! Setup actions
//!
//! External commands run while populating a layer. The `Executor` trait is
//! the seam: production uses `CommandExecutor`, tests script the results.

use crate::env::Environment;
use crate::error::{BuildpackError, BuildpackResult};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

/// A command to run, with the environment it runs in
#[derive(Debug, Clone)]
pub struct Execution {
    pub command: String,
    pub args: Vec<String>,
    pub env: Environment,
    pub dir: Option<PathBuf>,
}

impl Execution {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: Environment::new(),
            dir: None,
        }
    }

    /// Run with the given environment (replaces the inherited one)
    pub fn with_env(mut self, env: &Environment) -> Self {
        self.env = env.clone();
        self
    }

    /// Run from the given working directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }
}

impl fmt::Display for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs setup actions and returns their combined stdout/stderr
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run to completion. Fails with `SetupActionFailed` carrying the
    /// combined output on spawn failure or non-zero exit.
    async fn execute(&self, execution: &Execution) -> BuildpackResult<String>;
}

/// Executor backed by real subprocesses
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    async fn execute(&self, execution: &Execution) -> BuildpackResult<String> {
        debug!("Executing: {}", execution);

        let mut command = Command::new(&execution.command);
        command
            .args(&execution.args)
            .env_clear()
            .envs(execution.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &execution.dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| BuildpackError::setup_failed(execution.to_string(), "", e.to_string()))?;

        let output = combined_output(&mut child).await.join("\n");

        let status = child.wait().await.map_err(|e| {
            BuildpackError::setup_failed(execution.to_string(), output.clone(), e.to_string())
        })?;

        if !status.success() {
            return Err(BuildpackError::setup_failed(
                execution.to_string(),
                output,
                status.to_string(),
            ));
        }

        Ok(output)
    }
}

/// Collect stdout and stderr lines in arrival order.
///
/// Bytes that are not valid UTF-8 are replaced rather than ending the
/// stream; only EOF or a read error does that.
async fn combined_output(child: &mut Child) -> Vec<String> {
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Vec::new();
    };

    let mut stdout_reader = BufReader::new(stdout);
    let mut stderr_reader = BufReader::new(stderr);
    let mut stdout_line = Vec::new();
    let mut stderr_line = Vec::new();

    let mut all_output = Vec::new();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            read = stdout_reader.read_until(b'\n', &mut stdout_line), if !stdout_done => {
                match read {
                    Ok(0) | Err(_) => stdout_done = true,
                    Ok(_) => all_output.push(decode_line(&mut stdout_line)),
                }
            }
            read = stderr_reader.read_until(b'\n', &mut stderr_line), if !stderr_done => {
                match read {
                    Ok(0) | Err(_) => stderr_done = true,
                    Ok(_) => all_output.push(decode_line(&mut stderr_line)),
                }
            }
        }
    }

    all_output
}

/// Take a buffered line, dropping its line terminator
fn decode_line(buf: &mut Vec<u8>) -> String {
    let line = String::from_utf8_lossy(buf)
        .trim_end_matches(['\n', '\r'])
        .to_string();
    buf.clear();
    line
}
