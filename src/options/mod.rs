//! Per-cluster options and their environment defaults
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::fetch;

/// Directory under which per-cluster state (binaries, kubeconfig) is kept.
pub const DEFAULT_STATE_ROOT: &str = ".kindling";

/// Options for a [`crate::KindCluster`], with builder-style setters.
///
/// Everything has a sensible default: versions come from `KIND_VERSION` /
/// `KUBECTL_VERSION` (falling back to pinned releases), paths are derived
/// from the cluster name under [`DEFAULT_STATE_ROOT`].
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub name: String,
    pub kubeconfig: Option<PathBuf>,
    pub image: Option<String>,
    pub config_file: Option<PathBuf>,
    pub kind_version: String,
    pub kubectl_version: String,
    pub kind_path: Option<PathBuf>,
    pub kubectl_path: Option<PathBuf>,
    pub state_root: PathBuf,
}

impl ClusterOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kubeconfig: None,
            image: None,
            config_file: None,
            kind_version: fetch::kind_version(),
            kubectl_version: fetch::kubectl_version(),
            kind_path: None,
            kubectl_path: None,
            state_root: PathBuf::from(DEFAULT_STATE_ROOT),
        }
    }

    /// Use an explicit kubeconfig path instead of one under the state dir.
    pub fn kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Node image for `kind create cluster --image`.
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// kind cluster config file for `kind create cluster --config`.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn kind_version(mut self, version: impl Into<String>) -> Self {
        self.kind_version = version.into();
        self
    }

    pub fn kubectl_version(mut self, version: impl Into<String>) -> Self {
        self.kubectl_version = version.into();
        self
    }

    /// Use a pre-installed kind binary instead of downloading one.
    pub fn kind_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kind_path = Some(path.into());
        self
    }

    /// Use a pre-installed kubectl binary instead of downloading one.
    pub fn kubectl_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubectl_path = Some(path.into());
        self
    }

    pub fn state_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_root = path.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidOptions("cluster name cannot be empty".into()));
        }
        // kind names become container and context names
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        {
            return Err(Error::InvalidOptions(format!(
                "cluster name {:?} must be lowercase alphanumeric, '-' or '.'",
                self.name
            )));
        }
        if self.kind_version.is_empty() {
            return Err(Error::InvalidOptions("kind version cannot be empty".into()));
        }
        if self.kubectl_version.is_empty() {
            return Err(Error::InvalidOptions(
                "kubectl version cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ClusterOptions::new("foo");
        assert_eq!(opts.name, "foo");
        assert_eq!(opts.state_root, PathBuf::from(DEFAULT_STATE_ROOT));
        assert!(opts.kubeconfig.is_none());
        assert!(opts.image.is_none());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let opts = ClusterOptions::new("foo")
            .kubeconfig("/tmp/test.yaml")
            .image("kindest/node:v1.30.0")
            .kind_version("v0.24.0");
        assert_eq!(opts.kubeconfig, Some(PathBuf::from("/tmp/test.yaml")));
        assert_eq!(opts.image.as_deref(), Some("kindest/node:v1.30.0"));
        assert_eq!(opts.kind_version, "v0.24.0");
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(ClusterOptions::new("").validate().is_err());
        assert!(ClusterOptions::new("has space").validate().is_err());
        assert!(ClusterOptions::new("UPPER").validate().is_err());
        assert!(ClusterOptions::new("ok-name.1").validate().is_ok());
    }
}
