//! Builder for shelling out to the kind and kubectl binaries
use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use crate::error::{Error, Result};

/// Captured output of a finished subprocess.
pub struct CommandOutput {
    tool: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    fn from_output(tool: String, output: std::process::Output) -> Self {
        Self {
            tool,
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Stdout on success, otherwise an error carrying the tool name and stderr.
    pub fn into_result(self) -> Result<String> {
        if self.status.success() {
            Ok(self.stdout)
        } else {
            Err(Error::CommandFailed {
                tool: self.tool,
                status: self.status,
                stderr: self.stderr.trim_end().to_string(),
            })
        }
    }
}

/// Builder for invoking an external binary with captured output.
pub struct CommandBuilder {
    command: Command,
    tool: String,
}

impl CommandBuilder {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let tool = Path::new(program.as_ref())
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.as_ref().to_string_lossy().into_owned());
        let mut command = Command::new(program.as_ref());
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        Self { command, tool }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.command.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.command.env(key, val);
        self
    }

    /// Point the subprocess at a cluster's kubeconfig.
    pub fn kubeconfig(self, path: &Path) -> Self {
        self.env("KUBECONFIG", path)
    }

    /// Execute and return the captured output regardless of exit status.
    pub async fn output(mut self) -> Result<CommandOutput> {
        let output = self.command.output().await.map_err(|source| Error::Spawn {
            tool: self.tool.clone(),
            source,
        })?;
        Ok(CommandOutput::from_output(self.tool, output))
    }

    /// Execute and return stdout on success, error on failure.
    pub async fn run(self) -> Result<String> {
        self.output().await?.into_result()
    }

    /// Execute and ignore output (just check the exit status).
    pub async fn run_silent(self) -> Result<()> {
        self.output().await?.into_result().map(|_| ())
    }

    /// Start a long-running child without waiting for it.
    ///
    /// Output is discarded so an unread pipe can never stall the child, and
    /// the child is killed when the handle is dropped.
    pub fn spawn(mut self) -> Result<Child> {
        self.command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        self.command.spawn().map_err(|source| Error::Spawn {
            tool: self.tool,
            source,
        })
    }
}
