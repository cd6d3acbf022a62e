use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load kubeconfig `{path}`: {source}")]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: kube::config::KubeconfigError,
    },
    #[error("failed to infer cluster config: {0}")]
    InferConfig(#[source] kube::config::InferConfigError),
    #[error("failed to connect to cluster: {0}")]
    Connect(#[source] kube::Error),
    #[error("invalid pod name pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("list pods in namespace `{namespace}`: {source}")]
    ListPods {
        namespace: String,
        #[source]
        source: kube::Error,
    },
    #[error("open log stream ({pod} – {container}): {source}")]
    OpenStream {
        pod: String,
        container: String,
        #[source]
        source: kube::Error,
    },
    #[error("write output: {0}")]
    Output(#[source] std::io::Error),
    #[error("{task} task panicked")]
    TaskPanicked { task: &'static str },
    #[error("{task} did not stop within {grace:?}")]
    ShutdownTimedOut {
        task: &'static str,
        grace: std::time::Duration,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
