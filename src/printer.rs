use crate::error::{Error, Result};
use crate::types::{LogLine, SourceKey};
use crate::utils::{banner, paint};
use std::io::Write;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Single consumer of the merge queue.
pub struct Printer<W> {
    out: W,
    colored: bool,
    last: Option<SourceKey>,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, colored: bool) -> Self {
        Self {
            out,
            colored,
            last: None,
        }
    }

    /// Print one line, preceded by a banner when the source changed since the
    /// previous line.
    pub fn print(&mut self, msg: &LogLine) -> std::io::Result<()> {
        let source = &msg.source;
        if self.last.as_ref() != Some(&source.key) {
            let title = banner(&source.pod_name, &source.container_name);
            writeln!(
                self.out,
                "{}",
                paint(&title, source.color, true, self.colored)
            )?;
            self.last = Some(source.key.clone());
        }
        writeln!(
            self.out,
            "{}",
            paint(&msg.line, source.color, false, self.colored)
        )?;
        self.out.flush()
    }

    #[allow(dead_code)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> Printer<W> {
    /// Drain `rx` until every sender is dropped or `cancel` fires.
    ///
    /// Each write runs on the blocking pool so a stalled sink never holds up
    /// the runtime; the caller decides how long to wait for it.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<LogLine>,
        cancel: CancellationToken,
    ) -> Result<W> {
        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            let (printer, written) = tokio::task::spawn_blocking(move || {
                let written = self.print(&msg);
                (self, written)
            })
            .await
            .map_err(|_| Error::TaskPanicked { task: "printer" })?;
            self = printer;
            written.map_err(Error::Output)?;
        }
        debug!("Printer stopped");
        Ok(self.out)
    }
}
