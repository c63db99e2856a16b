use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::application::ports::{ToolError, ToolInvocation, ToolOutput, ToolRunner};

/// Runs pipeline tools as child processes.
///
/// `search_path` entries are prepended to `PATH` so bare script names such as
/// `1.Taxonomic-Assignments.pl` resolve to the platform's tool directories.
pub struct ProcessToolRunner {
    search_path: Vec<PathBuf>,
    timeout: Option<Duration>,
}

impl ProcessToolRunner {
    pub fn new(search_path: Vec<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            search_path,
            timeout,
        }
    }

    fn path_env(&self) -> Option<OsString> {
        if self.search_path.is_empty() {
            return None;
        }
        let inherited = env::var_os("PATH").unwrap_or_default();
        let dirs = self
            .search_path
            .iter()
            .cloned()
            .chain(env::split_paths(&inherited));
        env::join_paths(dirs).ok()
    }
}

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let program = invocation.program.clone();

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = self.path_env() {
            cmd.env("PATH", path);
        }

        tracing::debug!(command = %invocation, "Spawning external tool");

        let child = cmd.spawn().map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

        // The child moves into the wait future; dropping it on timeout kills the process.
        let waited = match self.timeout {
            Some(after) => match tokio::time::timeout(after, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => return Err(ToolError::Timeout { program, after }),
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(ToolOutput { stdout, stderr })
        } else {
            Err(ToolError::Failed {
                program,
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            })
        }
    }
}
