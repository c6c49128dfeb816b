//! kind cluster lifecycle, config generation, and port-forwarding
pub mod cluster;
pub mod config;
pub mod forward;

pub use cluster::KindCluster;
pub use config::{KindConfig, NodeRole, NodeSpec, PortMapping};
pub use forward::{ForwardOptions, PortForward};
