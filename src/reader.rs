use crate::error::{Error, Result};
use crate::kubernetes::Cluster;
use crate::types::{LogLine, Source};
use futures::io::AsyncBufReadExt;
use kube::api::LogParams;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Context shared by every reader spawned from one discovery loop.
pub struct TailContext<C> {
    pub cluster: Arc<C>,
    pub namespace: String,
    pub tail_lines: i64,
    pub tx: mpsc::Sender<LogLine>,
}

impl<C> Clone for TailContext<C> {
    fn clone(&self) -> Self {
        Self {
            cluster: Arc::clone(&self.cluster),
            namespace: self.namespace.clone(),
            tail_lines: self.tail_lines,
            tx: self.tx.clone(),
        }
    }
}

/// Stream one container's log into the merge queue until the stream ends or
/// `cancel` fires. A closed stream is never reopened.
pub async fn process<C: Cluster>(
    source: Arc<Source>,
    ctx: TailContext<C>,
    cancel: CancellationToken,
) -> Result<()> {
    let params = LogParams {
        follow: true,
        container: Some(source.container_name.clone()),
        tail_lines: Some(ctx.tail_lines),
        ..Default::default()
    };
    let opened = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        opened = ctx.cluster.log_stream(&source.pod_name, &params) => opened,
    };
    let mut stream = opened.map_err(|source_err| Error::OpenStream {
        pod: source.pod_name.clone(),
        container: source.container_name.clone(),
        source: source_err,
    })?;

    debug!(
        "Streaming {}/{} ({})",
        source.pod_name, source.container_name, source.key.container_id
    );

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            read = stream.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => break,
            // An unterminated fragment only shows up at end of stream
            Ok(_) if buf.last() != Some(&b'\n') => break,
            Ok(_) => {}
            Err(e) => {
                debug!(
                    "Error reading log stream {}/{}: {}",
                    source.pod_name, source.container_name, e
                );
                break;
            }
        }

        let msg = LogLine {
            source: Arc::clone(&source),
            line: decode_line(&buf),
        };
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            sent = ctx.tx.send(msg) => {
                if sent.is_err() {
                    // Printer is gone
                    return Ok(());
                }
            }
        }
    }

    debug!(
        "Log stream ended for {}/{}, not retrying",
        source.pod_name, source.container_name
    );
    Ok(())
}

/// Strip the line terminator and decode, replacing invalid UTF-8.
pub fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
