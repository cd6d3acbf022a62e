use crate::error::{Error, Result};
use crate::kubernetes::Cluster;
use crate::reader::{self, TailContext};
use crate::types::{PodSummary, Source, SourceKey};
use crate::utils::Color;
use futures::FutureExt;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A launched reader. Entries are never removed, so a container key is
/// subscribed at most once per run.
struct StreamTask {
    source: Arc<Source>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Polls the namespace and owns the registry of discovered containers.
pub struct Discovery<C> {
    ctx: TailContext<C>,
    pattern: Regex,
    interval: Duration,
    tasks: HashMap<SourceKey, StreamTask>,
    discovered: usize,
}

impl<C: Cluster> Discovery<C> {
    pub fn new(ctx: TailContext<C>, pattern: Regex, interval: Duration) -> Self {
        Self {
            ctx,
            pattern,
            interval,
            tasks: HashMap::new(),
            discovered: 0,
        }
    }

    /// Tick until cancelled. A failed pod listing ends the loop with an error.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        info!(
            "Discovering pods matching /{}/ in namespace {} every {:?}",
            self.pattern, self.ctx.namespace, self.interval
        );
        loop {
            let listed = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                listed = self.ctx.cluster.list_pods() => listed,
            };
            let pods = listed.map_err(|source| Error::ListPods {
                namespace: self.ctx.namespace.clone(),
                source,
            })?;
            self.reap()?;
            self.discover(&pods, cancel);

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Register and launch a reader for every unseen container on a matching
    /// pod. Returns the number of readers launched.
    pub fn discover(&mut self, pods: &[PodSummary], cancel: &CancellationToken) -> usize {
        let mut launched = 0;
        for pod in pods {
            if !self.pattern.is_match(&pod.name) {
                continue;
            }
            for container in &pod.containers {
                let Some(container_id) = &container.container_id else {
                    debug!(
                        "Container {}/{} has no id yet, waiting for next tick",
                        pod.name, container.name
                    );
                    continue;
                };
                let key = SourceKey {
                    pod_id: pod.uid.clone(),
                    container_id: container_id.clone(),
                };
                if self.tasks.contains_key(&key) {
                    continue;
                }

                let source = Arc::new(Source {
                    key: key.clone(),
                    pod_name: pod.name.clone(),
                    container_name: container.name.clone(),
                    color: Color::for_index(self.discovered),
                });
                self.discovered += 1;

                info!(
                    "NEW CONTAINER: {}/{} | {}",
                    pod.name, container.name, container_id
                );
                let task = self.spawn_reader(source, cancel.child_token());
                self.tasks.insert(key, task);
                launched += 1;
            }
        }
        launched
    }

    fn spawn_reader(&self, source: Arc<Source>, cancel: CancellationToken) -> StreamTask {
        let ctx = self.ctx.clone();
        let task_source = Arc::clone(&source);
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            // Stream errors stay local to the reader
            if let Err(err) = reader::process(task_source, ctx, task_cancel).await {
                warn!("{}", err);
            }
        });
        StreamTask {
            source,
            cancel,
            handle: Some(handle),
        }
    }

    /// Drop handles of readers that have already exited. A reader that
    /// panicked fails the run.
    fn reap(&mut self) -> Result<()> {
        let mut panicked = false;
        for task in self.tasks.values_mut() {
            let Some(mut handle) = task.handle.take_if(|h| h.is_finished()) else {
                continue;
            };
            match (&mut handle).now_or_never() {
                Some(Err(err)) if err.is_panic() => {
                    error!(
                        "Reader for {}/{} panicked",
                        task.source.pod_name, task.source.container_name
                    );
                    panicked = true;
                }
                Some(_) => debug!(
                    "Retired reader for {}/{}",
                    task.source.pod_name, task.source.container_name
                ),
                // Out of budget this tick, try again on the next
                None => task.handle = Some(handle),
            }
        }
        if panicked {
            return Err(Error::TaskPanicked { task: "reader" });
        }
        Ok(())
    }

    /// Snapshots of every container registered so far.
    #[allow(dead_code)]
    pub fn sources(&self) -> Vec<Arc<Source>> {
        self.tasks.values().map(|t| Arc::clone(&t.source)).collect()
    }

    /// Number of readers that have not exited yet.
    pub fn active(&self) -> usize {
        self.tasks
            .values()
            .filter(|t| t.handle.as_ref().is_some_and(|h| !h.is_finished()))
            .count()
    }

    /// Cancel every reader and wait for them, aborting any still running once
    /// `grace` has elapsed. Consumes the loop so its queue sender is dropped.
    pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
        let mut handles = Vec::new();
        for task in self.tasks.values_mut() {
            task.cancel.cancel();
            if let Some(handle) = task.handle.take() {
                handles.push(handle);
            }
        }
        drop(self);

        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let joined = tokio::time::timeout(grace, futures::future::join_all(handles)).await;
        let results = match joined {
            Ok(results) => results,
            Err(_) => {
                warn!("Readers did not stop within {:?}, aborting", grace);
                for abort in aborts {
                    abort.abort();
                }
                return Ok(());
            }
        };

        if results.iter().any(|r| r.as_ref().is_err_and(|e| e.is_panic())) {
            return Err(Error::TaskPanicked { task: "reader" });
        }
        Ok(())
    }
}
