//! `kube` client construction and apiserver readiness
use std::path::Path;
use std::time::Duration;

use k8s_openapi::apimachinery::pkg::version::Info;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::error::{Error, Result};
use crate::utils::polling::PollingConfig;

/// Build a client from the kubeconfig file kind wrote.
///
/// The file is parsed explicitly rather than inferred from the environment,
/// so a `KUBECONFIG` pointing at some other cluster can never leak in.
pub async fn from_kubeconfig(path: &Path) -> Result<Client> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let kubeconfig: Kubeconfig =
        serde_yaml::from_str(&raw).map_err(|e| Error::Kubeconfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::Kubeconfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Client::try_from(config).map_err(Error::Kube)
}

/// Version reported by the apiserver.
pub async fn server_version(client: &Client) -> Result<Info> {
    client.apiserver_version().await.map_err(Error::Kube)
}

/// Poll the apiserver version endpoint until it answers.
pub async fn wait_api_ready(client: &Client, timeout: Duration) -> Result<()> {
    PollingConfig::new(
        timeout,
        Duration::from_secs(2),
        "Kubernetes API server to be ready",
    )
    .poll_until(|| {
        let client = client.clone();
        async move { Ok(client.apiserver_version().await.is_ok()) }
    })
    .await
}
