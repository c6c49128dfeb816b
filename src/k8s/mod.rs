//! Kubernetes API client over a cluster's kubeconfig
pub mod client;

pub use client::{from_kubeconfig, server_version, wait_api_ready};
