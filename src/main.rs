mod cli;
mod discovery;
mod error;
mod group;
mod kubernetes;
mod printer;
mod reader;
mod types;
mod utils;

use anyhow::Context;
use clap::Parser;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cli::Cli;
use group::{TailConfig, TailGroup};
use kubernetes::KubeCluster;
use printer::Printer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout carries only the tailed lines
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = TailConfig::new(cli.namespace.clone(), &cli.pattern)?;
    config.interval = Duration::from_secs(cli.interval);
    config.tail_lines = cli.tail;

    let client = kubernetes::connect(cli.kubeconfig.as_deref(), cli.context.as_deref())
        .await
        .context("prepare k8s client")?;

    let colored = !cli.no_color && std::io::stdout().is_terminal();
    let printer = Printer::new(std::io::stdout(), colored);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let cluster = KubeCluster::new(client, &cli.namespace);
    let outcome = TailGroup::new(Arc::new(cluster), config)
        .run(printer, cancel)
        .await;
    if let Err(err) = outcome {
        // Exit here: dropping the runtime would wait on a write stuck on a
        // stalled stdout
        eprintln!("Error: {:?}", anyhow::Error::new(err).context("tail"));
        std::process::exit(1);
    }

    debug!("All tasks stopped");
    Ok(())
}

/// Cancel the run on Ctrl-C or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = interrupt => {}
        _ = terminate => {}
    }
    info!("Termination requested, shutting down");
    cancel.cancel();
}
