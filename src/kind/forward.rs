//! Background `kubectl port-forward` subprocess management
use std::path::Path;
use std::time::Duration;

use rand::Rng;
use tokio::net::TcpStream;
use tokio::process::Child;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::utils::command::CommandBuilder;

/// Retry and port-selection knobs for [`PortForward`].
#[derive(Debug, Clone)]
pub struct ForwardOptions {
    /// Fixed local port; a random ephemeral one is picked when unset.
    pub local_port: Option<u16>,
    /// Attempts before giving up. Pods that are still starting make the
    /// first forwards fail, so this defaults fairly high.
    pub retries: u32,
}

impl Default for ForwardOptions {
    fn default() -> Self {
        Self {
            local_port: None,
            retries: 10,
        }
    }
}

// Linux hands out ephemeral ports from 32768 up; staying below that range
// avoids colliding with a port the kernel just assigned to someone else.
fn ephemeral_port() -> u16 {
    rand::thread_rng().gen_range(5000..30000)
}

/// A running `kubectl port-forward` subprocess.
///
/// The subprocess is killed when this handle is dropped; call
/// [`stop`](Self::stop) to tear it down eagerly.
#[derive(Debug)]
pub struct PortForward {
    child: Child,
    local_port: u16,
    target: String,
}

impl PortForward {
    pub(crate) async fn open(
        kubectl_path: &Path,
        kubeconfig: &Path,
        target: &str,
        remote_port: u16,
        extra_args: &[&str],
        options: ForwardOptions,
    ) -> Result<Self> {
        let retries = options.retries.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=retries {
            let local_port = options.local_port.unwrap_or_else(ephemeral_port);
            let mut child = CommandBuilder::new(kubectl_path)
                .arg("port-forward")
                .arg(target)
                .arg(format!("{local_port}:{remote_port}"))
                .args(extra_args)
                .kubeconfig(kubeconfig)
                .spawn()?;

            // give kubectl a moment to bind or bail out
            tokio::time::sleep(Duration::from_secs(1)).await;

            match child.try_wait() {
                Ok(Some(status)) => {
                    last_reason = format!("kubectl port-forward exited with {status}");
                    debug!("attempt {attempt}/{retries}: {last_reason}");
                    continue;
                }
                Err(source) => {
                    return Err(Error::Spawn {
                        tool: "kubectl".to_string(),
                        source,
                    });
                }
                Ok(None) => {}
            }

            match TcpStream::connect(("127.0.0.1", local_port)).await {
                Ok(_) => {
                    info!("Forwarding {target} to 127.0.0.1:{local_port}");
                    return Ok(Self {
                        child,
                        local_port,
                        target: target.to_string(),
                    });
                }
                Err(e) => {
                    last_reason = format!("could not connect to 127.0.0.1:{local_port}: {e}");
                    debug!("attempt {attempt}/{retries}: {last_reason}");
                    let _ = child.start_kill();
                }
            }
        }

        Err(Error::PortForward {
            target: target.to_string(),
            attempts: retries,
            reason: last_reason,
        })
    }

    /// Local port the tunnel is bound to.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Kill the subprocess now instead of waiting for drop.
    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            debug!("killing port-forward to {}: {e}", self.target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ForwardOptions::default();
        assert_eq!(options.local_port, None);
        assert_eq!(options.retries, 10);
    }

    #[test]
    fn test_ephemeral_port_range() {
        for _ in 0..1000 {
            let port = ephemeral_port();
            assert!((5000..30000).contains(&port));
        }
    }

    #[tokio::test]
    async fn test_open_missing_kubectl() {
        let err = PortForward::open(
            Path::new("/nonexistent/kubectl"),
            Path::new("/tmp/kubeconfig"),
            "service/foo",
            80,
            &[],
            ForwardOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_open_exhausts_retries_when_child_exits() {
        // `false` stands in for a kubectl that dies immediately
        let err = PortForward::open(
            Path::new("/bin/false"),
            Path::new("/tmp/kubeconfig"),
            "service/foo",
            80,
            &[],
            ForwardOptions {
                local_port: None,
                retries: 2,
            },
        )
        .await
        .unwrap_err();
        match err {
            Error::PortForward {
                target, attempts, ..
            } => {
                assert_eq!(target, "service/foo");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
