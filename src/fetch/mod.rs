//! Download-URL resolution and on-disk caching for the kind and kubectl binaries
pub mod download;

pub use download::download_to_path;

use std::path::Path;

use tracing::info;
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_KIND_VERSION: &str = "v0.23.0";
pub const DEFAULT_KUBECTL_VERSION: &str = "v1.28.9";

/// Env var that replaces the kind download URL wholesale.
pub const KIND_DOWNLOAD_URL_ENV: &str = "KIND_DOWNLOAD_URL";
/// Env var that replaces the kubectl download URL wholesale.
pub const KUBECTL_DOWNLOAD_URL_ENV: &str = "KUBECTL_DOWNLOAD_URL";

/// OS name as used by kind/kubectl release artifacts.
pub fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// CPU architecture in Go naming, as used by Kubernetes release artifacts.
pub fn go_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Suffix for executables on the host platform.
pub fn exe_suffix() -> &'static str {
    if cfg!(windows) {
        ".exe"
    } else {
        ""
    }
}

/// kind version to install, from `KIND_VERSION` or the default.
pub fn kind_version() -> String {
    env_or("KIND_VERSION", DEFAULT_KIND_VERSION)
}

/// kubectl version to install, from `KUBECTL_VERSION` or the default.
pub fn kubectl_version() -> String {
    env_or("KUBECTL_VERSION", DEFAULT_KUBECTL_VERSION)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Release URL for the kind binary, honoring `KIND_DOWNLOAD_URL`.
pub fn kind_download_url(version: &str) -> Result<Url> {
    resolve_url(
        KIND_DOWNLOAD_URL_ENV,
        format!(
            "https://github.com/kubernetes-sigs/kind/releases/download/{}/kind-{}-{}",
            version,
            host_os(),
            go_arch()
        ),
    )
}

/// Release URL for the kubectl binary, honoring `KUBECTL_DOWNLOAD_URL`.
pub fn kubectl_download_url(version: &str) -> Result<Url> {
    resolve_url(
        KUBECTL_DOWNLOAD_URL_ENV,
        format!(
            "https://dl.k8s.io/release/{}/bin/{}/{}/kubectl{}",
            version,
            host_os(),
            go_arch(),
            exe_suffix()
        ),
    )
}

fn resolve_url(env_key: &str, default: String) -> Result<Url> {
    let raw = env_or(env_key, &default);
    Url::parse(&raw).map_err(|source| Error::InvalidUrl { url: raw, source })
}

/// Download a tool to `path` unless it is already cached there.
pub async fn ensure_tool(url: &Url, path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| Error::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    info!("Downloading {}...", url);
    download_to_path(url, path, true).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_go_arch_is_release_style() {
        let arch = go_arch();
        assert_ne!(arch, "x86_64");
        assert_ne!(arch, "aarch64");
    }

    #[test]
    #[serial]
    fn test_kind_url_default() {
        std::env::remove_var(KIND_DOWNLOAD_URL_ENV);
        let url = kind_download_url("v0.23.0").unwrap();
        assert!(url
            .as_str()
            .starts_with("https://github.com/kubernetes-sigs/kind/releases/download/v0.23.0/kind-"));
    }

    #[test]
    #[serial]
    fn test_kubectl_url_default() {
        std::env::remove_var(KUBECTL_DOWNLOAD_URL_ENV);
        let url = kubectl_download_url("v1.28.9").unwrap();
        assert!(url.as_str().starts_with("https://dl.k8s.io/release/v1.28.9/bin/"));
        assert!(url.path().contains("/kubectl"));
    }

    #[test]
    #[serial]
    fn test_url_override_wins() {
        std::env::set_var(KIND_DOWNLOAD_URL_ENV, "https://mirror.example.com/kind");
        let url = kind_download_url("v0.23.0").unwrap();
        assert_eq!(url.as_str(), "https://mirror.example.com/kind");
        std::env::remove_var(KIND_DOWNLOAD_URL_ENV);
    }

    #[test]
    #[serial]
    fn test_url_override_must_parse() {
        std::env::set_var(KIND_DOWNLOAD_URL_ENV, "not a url");
        let err = kind_download_url("v0.23.0").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
        std::env::remove_var(KIND_DOWNLOAD_URL_ENV);
    }

    #[test]
    #[serial]
    fn test_version_env_fallback() {
        std::env::remove_var("KIND_VERSION");
        assert_eq!(kind_version(), DEFAULT_KIND_VERSION);
        std::env::set_var("KIND_VERSION", "v0.99.0");
        assert_eq!(kind_version(), "v0.99.0");
        std::env::remove_var("KIND_VERSION");
    }
}
