//! Ephemeral [kind](https://kind.sigs.k8s.io) clusters for integration tests.
//!
//! kindling downloads the platform-specific kind and kubectl binaries, caches
//! them on disk, and shells out to them to create and tear down local
//! Kubernetes clusters from test code. Cluster handles expose a kubectl
//! passthrough, a [`kube`] API client, and background port-forwarding.
//!
//! ```no_run
//! use kindling::KindCluster;
//!
//! #[tokio::main]
//! async fn main() -> kindling::Result<()> {
//!     let cluster = KindCluster::new("smoke")?;
//!     cluster.create().await?;
//!
//!     let pods = cluster.kubectl(["get", "pods", "--all-namespaces"]).await?;
//!     println!("{pods}");
//!
//!     let dns = cluster
//!         .port_forward_with("service/kube-dns", 53, &["-n", "kube-system"], Default::default())
//!         .await?;
//!     println!("kube-dns on 127.0.0.1:{}", dns.local_port());
//!
//!     cluster.delete().await
//! }
//! ```
//!
//! Environment knobs: `KIND_VERSION` / `KUBECTL_VERSION` pick tool versions,
//! `KIND_DOWNLOAD_URL` / `KUBECTL_DOWNLOAD_URL` override the download source
//! wholesale, and `KIND_CLUSTER_NAME` / `KIND_KEEP_CLUSTER` steer the shared
//! [`fixture`] cluster.

pub mod error;
pub mod fetch;
pub mod fixture;
pub mod k8s;
pub mod kind;
pub mod options;
pub(crate) mod utils;

pub use error::{Error, Result};
pub use kind::{
    ForwardOptions, KindCluster, KindConfig, NodeRole, NodeSpec, PortForward, PortMapping,
};
pub use options::ClusterOptions;
