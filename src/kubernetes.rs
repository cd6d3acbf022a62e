use crate::error::{Error, Result};
use crate::types::{ContainerId, ContainerSummary, PodId, PodSummary};
use futures::io::AsyncBufRead;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, ResourceExt};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tracing::{debug, info};

/// A live, newline-delimited log stream for one container.
pub type LogStream<'a> = Pin<Box<dyn AsyncBufRead + Send + 'a>>;

/// The two cluster operations the tailer depends on, scoped to one namespace.
pub trait Cluster: Send + Sync + 'static {
    /// All pods in the namespace, unfiltered.
    fn list_pods(&self) -> impl Future<Output = Result<Vec<PodSummary>, kube::Error>> + Send;

    /// Open a log stream for `pod_name` with the given parameters. The stream
    /// borrows its arguments for as long as it is read.
    fn log_stream<'a>(
        &'a self,
        pod_name: &'a str,
        params: &'a LogParams,
    ) -> impl Future<Output = Result<LogStream<'a>, kube::Error>> + Send + 'a;
}

pub struct KubeCluster {
    pods: Api<Pod>,
}

impl KubeCluster {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
        }
    }
}

impl Cluster for KubeCluster {
    async fn list_pods(&self) -> Result<Vec<PodSummary>, kube::Error> {
        let pods = self.pods.list(&ListParams::default()).await?;
        Ok(pods.items.iter().map(pod_summary).collect())
    }

    async fn log_stream<'a>(
        &'a self,
        pod_name: &'a str,
        params: &'a LogParams,
    ) -> Result<LogStream<'a>, kube::Error> {
        let stream = self.pods.log_stream(pod_name, params).await?;
        Ok(Box::pin(stream))
    }
}

/// Reduce a pod to the fields discovery needs. Containers come from the
/// reported statuses rather than the pod spec, so only containers the kubelet knows
/// about are listed.
pub fn pod_summary(pod: &Pod) -> PodSummary {
    let name = pod.name_any();
    let containers = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map(|statuses| {
            statuses
                .iter()
                .map(|cs| ContainerSummary {
                    name: cs.name.clone(),
                    container_id: cs
                        .container_id
                        .as_ref()
                        .filter(|id| !id.is_empty())
                        .map(|id| ContainerId(id.clone())),
                })
                .collect()
        })
        .unwrap_or_default();

    PodSummary {
        // UID is always set on pods read back from the API server
        uid: PodId(pod.uid().unwrap_or_else(|| name.clone())),
        name,
        containers,
    }
}

/// Build a client from an explicit kubeconfig path, or fall back to kube's
/// usual inference, then make sure the API server answers.
pub async fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kc = Kubeconfig::read_from(path).map_err(|source| Error::Kubeconfig {
                path: path.to_path_buf(),
                source,
            })?;
            let options = KubeConfigOptions {
                context: context.map(str::to_string),
                ..Default::default()
            };
            kube::Config::from_custom_kubeconfig(kc, &options)
                .await
                .map_err(|source| Error::Kubeconfig {
                    path: path.to_path_buf(),
                    source,
                })?
        }
        None if context.is_some() => {
            let options = KubeConfigOptions {
                context: context.map(str::to_string),
                ..Default::default()
            };
            kube::Config::from_kubeconfig(&options)
                .await
                .map_err(|source| Error::Kubeconfig {
                    path: "~/.kube/config".into(),
                    source,
                })?
        }
        None => kube::Config::infer().await.map_err(Error::InferConfig)?,
    };

    debug!("Using cluster {}", config.cluster_url);
    let client = Client::try_from(config).map_err(Error::Connect)?;
    let version = client.apiserver_version().await.map_err(Error::Connect)?;
    info!("Connected to API server {}", version.git_version);
    Ok(client)
}
