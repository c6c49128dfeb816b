//! Process-wide shared cluster for test binaries
//!
//! Rust test binaries have no session-teardown hook, so the shared cluster
//! is left running at process exit and reused by the next run (creation is
//! idempotent). Harnesses that do have a teardown point can call
//! [`teardown_shared`].
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::Result;
use crate::kind::KindCluster;

/// Overrides the shared cluster's name.
pub const CLUSTER_NAME_ENV: &str = "KIND_CLUSTER_NAME";
/// Set to `1`/`true`/`yes` to retain the shared cluster on teardown.
pub const KEEP_CLUSTER_ENV: &str = "KIND_KEEP_CLUSTER";

pub const DEFAULT_CLUSTER_NAME: &str = "kindling";

static SHARED: OnceCell<KindCluster> = OnceCell::const_new();

/// Cluster shared by every test in the current process.
///
/// The first caller provisions it; later callers get the same handle. An
/// existing cluster with the same name is reused rather than recreated.
pub async fn shared_cluster() -> Result<&'static KindCluster> {
    SHARED
        .get_or_try_init(|| async {
            let name = std::env::var(CLUSTER_NAME_ENV)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string());
            info!("Provisioning shared cluster {name}...");
            let cluster = KindCluster::new(name)?;
            cluster.create().await?;
            Ok(cluster)
        })
        .await
}

/// Whether `KIND_KEEP_CLUSTER` asks for the cluster to be retained.
pub fn keep_cluster() -> bool {
    std::env::var(KEEP_CLUSTER_ENV)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Delete the shared cluster unless retention was requested.
///
/// A no-op when no test in this process ever asked for the shared cluster.
pub async fn teardown_shared() -> Result<()> {
    if keep_cluster() {
        return Ok(());
    }
    if let Some(cluster) = SHARED.get() {
        cluster.delete().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_keep_cluster_parsing() {
        std::env::remove_var(KEEP_CLUSTER_ENV);
        assert!(!keep_cluster());

        for value in ["1", "true", "TRUE", "yes"] {
            std::env::set_var(KEEP_CLUSTER_ENV, value);
            assert!(keep_cluster(), "{value} should enable retention");
        }

        std::env::set_var(KEEP_CLUSTER_ENV, "0");
        assert!(!keep_cluster());
        std::env::remove_var(KEEP_CLUSTER_ENV);
    }
}
