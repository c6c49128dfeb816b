//! Typed `kind.x-k8s.io/v1alpha4` cluster config
//!
//! Covers the subset tests actually reach for (multi-node topologies, node
//! images, host port mappings); anything else can still be passed as a
//! hand-written file via [`crate::ClusterOptions::config_file`].
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindConfig {
    pub kind: String,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub role: NodeRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(
        rename = "extraPortMappings",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extra_port_mappings: Vec<PortMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    ControlPlane,
    Worker,
}

/// Host-to-node port mapping on a kind node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortMapping {
    #[serde(rename = "containerPort")]
    pub container_port: u16,
    #[serde(rename = "hostPort")]
    pub host_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(
        rename = "listenAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub listen_address: Option<String>,
}

impl Default for KindConfig {
    fn default() -> Self {
        Self {
            kind: "Cluster".to_string(),
            api_version: "kind.x-k8s.io/v1alpha4".to_string(),
            nodes: Vec::new(),
        }
    }
}

impl KindConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A topology with the given number of control-plane and worker nodes.
    pub fn with_nodes(control_planes: u32, workers: u32) -> Self {
        let mut config = Self::new();
        for _ in 0..control_planes {
            config.nodes.push(NodeSpec::new(NodeRole::ControlPlane));
        }
        for _ in 0..workers {
            config.nodes.push(NodeSpec::new(NodeRole::Worker));
        }
        config
    }

    pub fn node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::Yaml)
    }

    /// Write the config to `path` for `kind create cluster --config`.
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        tokio::fs::write(path, yaml)
            .await
            .map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl NodeSpec {
    pub fn new(role: NodeRole) -> Self {
        Self {
            role,
            image: None,
            extra_port_mappings: Vec::new(),
        }
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn map_port(mut self, container_port: u16, host_port: u16) -> Self {
        self.extra_port_mappings.push(PortMapping {
            container_port,
            host_port,
            protocol: None,
            listen_address: None,
        });
        self
    }
}
