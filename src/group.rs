use crate::discovery::Discovery;
use crate::error::{Error, Result};
use crate::kubernetes::Cluster;
use crate::printer::Printer;
use crate::reader::TailContext;
use regex::Regex;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TAIL_LINES: i64 = 10;
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// tokio channels need at least one slot; this is as close to a rendezvous as
// it gets, so a stalled printer holds back every reader.
const MERGE_QUEUE_CAPACITY: usize = 1;

/// Settings for one tailing run.
#[derive(Debug, Clone)]
pub struct TailConfig {
    pub namespace: String,
    pub pattern: Regex,
    pub interval: Duration,
    pub tail_lines: i64,
}

impl TailConfig {
    pub fn new(namespace: impl Into<String>, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| Error::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            namespace: namespace.into(),
            pattern,
            interval: DEFAULT_INTERVAL,
            tail_lines: DEFAULT_TAIL_LINES,
        })
    }
}

/// Discovery, every reader and the printer, run as one cancellable unit.
pub struct TailGroup<C> {
    cluster: Arc<C>,
    config: TailConfig,
    grace: Duration,
}

impl<C: Cluster> TailGroup<C> {
    pub fn new(cluster: Arc<C>, config: TailConfig) -> Self {
        Self {
            cluster,
            config,
            grace: SHUTDOWN_GRACE,
        }
    }

    #[allow(dead_code)]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Run until `cancel` fires or a fatal error occurs, then wind everything
    /// down. Returns the printer's sink, or the first error seen.
    pub async fn run<W>(self, out: Printer<W>, cancel: CancellationToken) -> Result<W>
    where
        W: Write + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(MERGE_QUEUE_CAPACITY);

        let printer_cancel = cancel.clone();
        let printer = tokio::spawn(async move {
            let res = out.run(rx, printer_cancel.clone()).await;
            if res.is_err() {
                printer_cancel.cancel();
            }
            res
        });

        let ctx = TailContext {
            cluster: self.cluster,
            namespace: self.config.namespace,
            tail_lines: self.config.tail_lines,
            tx,
        };
        let mut discovery = Discovery::new(ctx, self.config.pattern, self.config.interval);
        let discovered = discovery.run(&cancel).await;
        if discovered.is_err() {
            debug!("Discovery failed, cancelling all tasks");
        }

        cancel.cancel();
        debug!("Stopping {} active readers", discovery.active());
        let stopped = discovery.shutdown(self.grace).await;

        // A stalled sink must not hold the run open
        let printer_abort = printer.abort_handle();
        let printed = match tokio::time::timeout(self.grace, printer).await {
            Ok(Ok(printed)) => printed,
            Ok(Err(_)) => Err(Error::TaskPanicked { task: "printer" }),
            Err(_) => {
                warn!("Output did not drain within {:?}, abandoning it", self.grace);
                printer_abort.abort();
                Err(Error::ShutdownTimedOut {
                    task: "printer",
                    grace: self.grace,
                })
            }
        };

        discovered?;
        let sink = printed?;
        stopped?;
        Ok(sink)
    }
}
