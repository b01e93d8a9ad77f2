//! Traitscope CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use traitscope::cli::commands::{evolution, pipeline, profile, score, CommandContext};
use traitscope::cli::{handle_error, Cli, Commands};
use traitscope::infrastructure::config::ConfigLoader;
use traitscope::infrastructure::logging::{prune_expired_logs, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    let _logger = LoggerImpl::init(&config.logging)?;
    if let Some(log_dir) = &config.logging.log_dir {
        if let Err(err) = prune_expired_logs(log_dir, config.logging.retention_days).await {
            warn!(error = %err, "log retention cleanup failed");
        }
    }

    let ctx = CommandContext::open(config).await?;
    let json = cli.json;

    match cli.command {
        Commands::Ingest(args) => pipeline::execute_ingest(args, &ctx, json).await,
        Commands::Extract(args) => pipeline::execute_extract(args, &ctx, json).await,
        Commands::Aggregate(args) => pipeline::execute_aggregate(args, &ctx, json).await,
        Commands::Recompute(args) => pipeline::execute_recompute(args, &ctx, json).await,
        Commands::Score(args) => score::execute(args, &ctx, json).await,
        Commands::Arc(args) => evolution::execute_arc(args, &ctx, json).await,
        Commands::Snapshot(args) => evolution::execute_snapshot(args, &ctx, json).await,
        Commands::Timeline(args) => evolution::execute_timeline(args, &ctx, json).await,
        Commands::Profile(args) => profile::execute_profile(args, &ctx, json).await,
        Commands::Resolve(args) => profile::execute_resolve(args, &ctx, json).await,
    }
}
