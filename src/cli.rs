use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kubectl-clogs")]
#[command(about = "Tail and merge logs from every container of matching pods")]
pub struct Cli {
    /// Regular expression pod names must match
    #[arg(default_value = ".*")]
    pub pattern: String,

    /// Path to the kubeconfig file
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context
    #[arg(long)]
    pub context: Option<String>,

    /// Namespace
    #[arg(short = 'n', long, default_value = "default")]
    pub namespace: String,

    /// Seconds between pod discovery polls
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Lines of backlog to show for each newly discovered container
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(i64).range(0..))]
    pub tail: i64,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
