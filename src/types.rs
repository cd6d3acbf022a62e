use crate::utils::Color;
use std::fmt;
use std::sync::Arc;

/// Pod UID as reported by the API server.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct PodId(pub String);

/// Container instance id (`containerd://...`). Changes on every restart.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ContainerId(pub String);

/// Identity of one log source: a container instance within a pod.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SourceKey {
    pub pod_id: PodId,
    pub container_id: ContainerId,
}

impl fmt::Display for PodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a discovered container, handed to its reader at spawn time.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub key: SourceKey,
    pub pod_name: String,
    pub container_name: String,
    pub color: Color,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub source: Arc<Source>,
    pub line: String,
}

#[derive(Debug, Clone)]
pub struct PodSummary {
    pub uid: PodId,
    pub name: String,
    pub containers: Vec<ContainerSummary>,
}

#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub name: String,
    // None until the runtime has created the container
    pub container_id: Option<ContainerId>,
}
