//! kind cluster lifecycle wrapper
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::fetch;
use crate::k8s;
use crate::kind::forward::{ForwardOptions, PortForward};
use crate::options::ClusterOptions;
use crate::utils::command::CommandBuilder;

/// Handle to a kind cluster and its on-disk state.
///
/// The handle itself is cheap to construct; nothing talks to Docker until
/// [`create`](Self::create) is called. Binaries are downloaded on first use
/// and cached in the cluster's state directory.
pub struct KindCluster {
    name: String,
    state_dir: PathBuf,
    kubeconfig_path: PathBuf,
    image: Option<String>,
    config_file: Option<PathBuf>,
    kind_version: String,
    kubectl_version: String,
    kind_path: PathBuf,
    kubectl_path: PathBuf,
}

impl KindCluster {
    /// A cluster handle with default options.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_options(ClusterOptions::new(name))
    }

    pub fn with_options(options: ClusterOptions) -> Result<Self> {
        options.validate()?;

        let state_dir = options.state_root.join(&options.name);
        std::fs::create_dir_all(&state_dir).map_err(|source| Error::Io {
            path: state_dir.clone(),
            source,
        })?;

        let kubeconfig_path = options
            .kubeconfig
            .unwrap_or_else(|| state_dir.join("kubeconfig"));
        let kind_path = options
            .kind_path
            .unwrap_or_else(|| state_dir.join(format!("kind-{}", options.kind_version)));
        let kubectl_path = options.kubectl_path.unwrap_or_else(|| {
            state_dir.join(format!(
                "kubectl-{}{}",
                options.kubectl_version,
                fetch::exe_suffix()
            ))
        });

        Ok(Self {
            name: options.name,
            state_dir,
            kubeconfig_path,
            image: options.image,
            config_file: options.config_file,
            kind_version: options.kind_version,
            kubectl_version: options.kubectl_version,
            kind_path,
            kubectl_path,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn kubeconfig_path(&self) -> &Path {
        &self.kubeconfig_path
    }

    pub fn kind_path(&self) -> &Path {
        &self.kind_path
    }

    pub fn kubectl_path(&self) -> &Path {
        &self.kubectl_path
    }

    /// Download the kind binary into the state dir unless already cached.
    pub async fn ensure_kind(&self) -> Result<()> {
        let url = fetch::kind_download_url(&self.kind_version)?;
        fetch::ensure_tool(&url, &self.kind_path).await
    }

    /// Download the kubectl binary into the state dir unless already cached.
    pub async fn ensure_kubectl(&self) -> Result<()> {
        let url = fetch::kubectl_download_url(&self.kubectl_version)?;
        fetch::ensure_tool(&url, &self.kubectl_path).await
    }

    /// Whether a cluster with this name is known to kind.
    pub async fn exists(&self) -> Result<bool> {
        self.ensure_kind().await?;
        let out = CommandBuilder::new(&self.kind_path)
            .args(["get", "clusters"])
            .run()
            .await?;
        Ok(out.lines().any(|line| line.trim() == self.name))
    }

    /// Create the cluster if it does not exist (otherwise reuse it).
    ///
    /// If kind reports success but the kubeconfig never materializes, the
    /// cluster is deleted and creation is retried.
    pub async fn create(&self) -> Result<()> {
        self.ensure_kind().await?;
        self.touch_kubeconfig()?;

        let mut cluster_exists = false;
        while !cluster_exists {
            cluster_exists = self.exists().await?;

            if !cluster_exists {
                info!("Creating cluster {}...", self.name);
                CommandBuilder::new(&self.kind_path)
                    .args(self.create_args())
                    .run_silent()
                    .await?;
                cluster_exists = true;
            }

            if !self.kubeconfig_path.exists() {
                warn!(
                    "kubeconfig missing at {}, recreating cluster {}",
                    self.kubeconfig_path.display(),
                    self.name
                );
                self.delete().await?;
                cluster_exists = false;
            }
        }

        Ok(())
    }

    /// Delete the cluster (`kind delete cluster`).
    pub async fn delete(&self) -> Result<()> {
        info!("Deleting cluster {}...", self.name);
        CommandBuilder::new(&self.kind_path)
            .args(self.delete_args())
            .run_silent()
            .await
    }

    /// Load a local Docker image into the cluster nodes.
    pub async fn load_docker_image(&self, image: &str) -> Result<()> {
        info!("Loading Docker image {} into cluster {}...", image, self.name);
        CommandBuilder::new(&self.kind_path)
            .args(["load", "docker-image", "--name", &self.name, image])
            .run_silent()
            .await
    }

    /// Run kubectl against the cluster and return its stdout.
    pub async fn kubectl<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.ensure_kubectl().await?;
        CommandBuilder::new(&self.kubectl_path)
            .args(args)
            .kubeconfig(&self.kubeconfig_path)
            .run()
            .await
    }

    /// Run kubectl with `-o json` appended and parse the output.
    pub async fn kubectl_json<I, S>(&self, args: I) -> Result<serde_json::Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut full: Vec<OsString> = args
            .into_iter()
            .map(|a| a.as_ref().to_os_string())
            .collect();
        full.push("-o".into());
        full.push("json".into());
        let out = self.kubectl(full).await?;
        serde_json::from_str(&out).map_err(Error::Json)
    }

    /// Forward a random local port to `remote_port` of a service or pod.
    ///
    /// `target` is anything kubectl accepts: `pod/name`, `service/name`, or a
    /// bare pod name.
    pub async fn port_forward(&self, target: &str, remote_port: u16) -> Result<PortForward> {
        self.port_forward_with(target, remote_port, &[], ForwardOptions::default())
            .await
    }

    /// [`port_forward`](Self::port_forward) with extra kubectl arguments
    /// (e.g. `-n kube-system`) and explicit retry/port options.
    pub async fn port_forward_with(
        &self,
        target: &str,
        remote_port: u16,
        extra_args: &[&str],
        options: ForwardOptions,
    ) -> Result<PortForward> {
        self.ensure_kubectl().await?;
        PortForward::open(
            &self.kubectl_path,
            &self.kubeconfig_path,
            target,
            remote_port,
            extra_args,
            options,
        )
        .await
    }

    /// A `kube` API client built from this cluster's kubeconfig.
    pub async fn api_client(&self) -> Result<kube::Client> {
        k8s::client::from_kubeconfig(&self.kubeconfig_path).await
    }

    /// Poll the apiserver until it answers or `timeout` elapses.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = self.api_client().await?;
        k8s::client::wait_api_ready(&client, timeout).await
    }

    // kind writes into the kubeconfig; pre-create it with owner-only mode so
    // credentials are never world-readable.
    fn touch_kubeconfig(&self) -> Result<()> {
        let mut open = std::fs::OpenOptions::new();
        open.create(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            open.mode(0o600);
        }
        open.open(&self.kubeconfig_path)
            .map(|_| ())
            .map_err(|source| Error::Io {
                path: self.kubeconfig_path.clone(),
                source,
            })
    }

    fn create_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["create".into(), "cluster".into()];
        args.push(format!("--name={}", self.name).into());
        let mut kubeconfig_arg = OsString::from("--kubeconfig=");
        kubeconfig_arg.push(self.kubeconfig_path.as_os_str());
        args.push(kubeconfig_arg);
        if let Some(image) = &self.image {
            args.push(format!("--image={image}").into());
        }
        if let Some(config) = &self.config_file {
            args.push("--config".into());
            args.push(config.as_os_str().to_os_string());
        }
        args
    }

    fn delete_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["delete".into(), "cluster".into()];
        args.push(format!("--name={}", self.name).into());
        let mut kubeconfig_arg = OsString::from("--kubeconfig=");
        kubeconfig_arg.push(self.kubeconfig_path.as_os_str());
        args.push(kubeconfig_arg);
        args
    }
}
