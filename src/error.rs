//! Error type for cluster provisioning and teardown
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download of {url} returned HTTP {status}")]
    DownloadStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed with {status}: {stderr}")]
    CommandFailed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("port-forward to {target} failed after {attempts} attempts: {reason}")]
    PortForward {
        target: String,
        attempts: u32,
        reason: String,
    },

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("invalid kubeconfig at {}: {reason}", path.display())]
    Kubeconfig { path: PathBuf, reason: String },

    #[error("invalid download URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid cluster options: {0}")]
    InvalidOptions(String),

    #[error("failed to parse kubectl output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
