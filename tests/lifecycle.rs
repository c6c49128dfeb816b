//! End-to-end tests against real kind clusters.
//!
//! These need Docker and network access, so they are `#[ignore]`d and run
//! one at a time: `cargo test --test lifecycle -- --ignored`.

use std::time::Duration;

use anyhow::{Context, Result};
use kindling::{fixture, ClusterOptions, ForwardOptions, KindCluster};
use serial_test::serial;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kindling=debug".into()),
        )
        .try_init();
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_create_delete() -> Result<()> {
    init_logging();
    let cluster = KindCluster::new("kindling-test-create-delete")?;
    let created = cluster.create().await;
    // tear down even when create failed half-way
    let deleted = cluster.delete().await;
    created.context("create")?;
    deleted.context("delete")?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_create_is_idempotent() -> Result<()> {
    init_logging();
    let cluster = KindCluster::new("kindling-test-idempotent")?;
    let outcome = async {
        cluster.create().await.context("first create")?;
        cluster.create().await.context("second create")?;
        assert!(cluster.exists().await?);
        Ok::<_, anyhow::Error>(())
    }
    .await;
    cluster.delete().await?;
    outcome?;
    assert!(!cluster.exists().await?);
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_cluster_end_to_end() -> Result<()> {
    init_logging();
    let cluster = KindCluster::with_options(ClusterOptions::new("kindling-test-e2e"))?;
    let outcome = run_end_to_end(&cluster).await;
    cluster.delete().await?;
    outcome
}

async fn run_end_to_end(cluster: &KindCluster) -> Result<()> {
    cluster.create().await.context("create")?;
    cluster
        .wait_ready(Duration::from_secs(120))
        .await
        .context("apiserver readiness")?;

    // kubectl passthrough sees the cluster
    let version = cluster.kubectl(["version"]).await?;
    assert!(version.contains("Server Version"), "got: {version}");

    let nodes = cluster.kubectl_json(["get", "nodes"]).await?;
    let items = nodes["items"].as_array().context("items array")?;
    assert!(!items.is_empty());

    // API client agrees with the control plane
    let client = cluster.api_client().await?;
    let info = kindling::k8s::server_version(&client).await?;
    assert!(!info.major.is_empty());

    // image loading
    let status = tokio::process::Command::new("docker")
        .args(["pull", "busybox"])
        .status()
        .await?;
    assert!(status.success(), "docker pull busybox failed");
    cluster.load_docker_image("busybox").await?;

    // port-forward to kube-dns once coredns is up
    cluster
        .kubectl([
            "rollout",
            "status",
            "deploy/coredns",
            "-n",
            "kube-system",
            "--timeout",
            "180s",
        ])
        .await
        .context("coredns rollout")?;

    // generous retries, the pod can stay pending for a while
    let forward = cluster
        .port_forward_with(
            "service/kube-dns",
            53,
            &["-n", "kube-system"],
            ForwardOptions {
                local_port: None,
                retries: 20,
            },
        )
        .await?;
    assert!(forward.local_port() >= 1024);
    let stream = tokio::net::TcpStream::connect(("127.0.0.1", forward.local_port())).await?;
    drop(stream);
    forward.stop().await;

    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_shared_fixture_returns_same_cluster() -> Result<()> {
    init_logging();
    let first = fixture::shared_cluster().await?;
    let second = fixture::shared_cluster().await?;
    assert_eq!(first.name(), second.name());
    assert!(first.exists().await?);
    fixture::teardown_shared().await?;
    Ok(())
}
