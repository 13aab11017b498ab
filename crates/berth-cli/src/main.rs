use std::path::PathBuf;

use berth_core::BerthConfig;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "berth",
    about = "berth — pick hosts for containers",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to berth.toml (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a container request and print the result
    Normalize {
        /// JSON container request
        #[arg(short, long)]
        request: PathBuf,
    },
    /// Rank the hosts of a cluster for a request
    Rank {
        /// TOML cluster description
        #[arg(long)]
        cluster: PathBuf,
        /// JSON container request
        #[arg(short, long)]
        request: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Place one or more containers, reserving capacity as it goes
    Place {
        #[arg(long)]
        cluster: PathBuf,
        #[arg(short, long)]
        request: PathBuf,
        /// Container name; replicas get a numeric suffix
        #[arg(short, long, default_value = "container")]
        name: String,
        /// Number of replicas to place
        #[arg(long, default_value = "1")]
        count: u32,
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BerthConfig::from_file(path)?,
        None => BerthConfig::default(),
    };

    // RUST_LOG wins over the configured filter.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(
        strategy = %config.placement.strategy,
        namespace = %config.placement.label_namespace,
        "configuration loaded"
    );

    match cli.command {
        Commands::Normalize { request } => commands::normalize::run(&config, &request),
        Commands::Rank {
            cluster,
            request,
            format,
        } => commands::rank::run(&config, &cluster, &request, &format),
        Commands::Place {
            cluster,
            request,
            name,
            count,
            format,
        } => commands::place::run(&config, &cluster, &request, &name, count, &format),
    }
}
