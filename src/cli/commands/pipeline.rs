//! Batch pipeline commands: ingest, extract, aggregate, recompute.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;
use tracing::warn;

use super::{parse_user_id, CommandContext};
use crate::adapters::extraction::{ReplayExtractor, RetryPolicy, RetryingExtractor};
use crate::adapters::sqlite::SqliteStore;
use crate::cli::output::{output, table, CommandOutput};
use crate::cli::progress::spawn_progress_renderer;
use crate::domain::ports::UnprocessedFilter;
use crate::services::{BatchPipeline, PipelineProgress, PipelineStatus};

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Dataset path (defaults to pipeline.dataset_path)
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// JSONL file of recorded signal sets keyed by conversation id
    #[arg(long)]
    pub replay: PathBuf,
    /// Maximum number of conversations to process
    #[arg(short, long)]
    pub limit: Option<usize>,
    /// Only this user's conversations
    #[arg(short, long)]
    pub user: Option<String>,
}

#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Only this user (defaults to every known user)
    #[arg(short, long)]
    pub user: Option<String>,
}

#[derive(Args, Debug)]
pub struct RecomputeArgs {
    /// Only this user (defaults to every known user)
    #[arg(short, long)]
    pub user: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<PipelineProgress>,
}

impl CommandOutput for PipelineReport {
    fn to_human(&self) -> String {
        let mut t = table(["Stage", "Total", "Processed", "Failed", "Status"]);
        for stage in &self.stages {
            t.add_row(vec![
                Cell::new(stage.stage),
                Cell::new(stage.total),
                Cell::new(stage.processed),
                Cell::new(stage.failed),
                Cell::new(stage.status.as_str()),
            ]);
        }
        t.to_string()
    }
}

/// Run one pipeline stage with a progress display and Ctrl-C cancellation.
async fn run_stage<F, Fut>(
    ctx: &CommandContext,
    json_mode: bool,
    configure: impl FnOnce(BatchPipeline<SqliteStore>) -> BatchPipeline<SqliteStore>,
    stage: F,
) -> Result<PipelineReport>
where
    F: FnOnce(Arc<BatchPipeline<SqliteStore>>) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<PipelineProgress>>>,
{
    let (events, renderer) = spawn_progress_renderer(json_mode);
    let pipeline = Arc::new(configure(
        BatchPipeline::new(ctx.store.clone(), ctx.config.clone()).with_events(events),
    ));

    let cancel = pipeline.cancellation_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after in-flight units");
            cancel.cancel();
        }
    });

    let result = stage(pipeline).await;
    interrupt.abort();
    // The pipeline (and its event sender) is gone; wait for the last frame.
    let _ = renderer.await;

    let stages = result?;
    if stages.iter().any(|s| s.status == PipelineStatus::Cancelled) {
        warn!("pipeline cancelled");
    }
    Ok(PipelineReport { stages })
}

pub async fn execute_ingest(args: IngestArgs, ctx: &CommandContext, json_mode: bool) -> Result<()> {
    let path = args
        .path
        .unwrap_or_else(|| ctx.config.pipeline.dataset_path.clone());
    let report = run_stage(ctx, json_mode, |p| p, |pipeline| async move {
        let progress = pipeline
            .run_ingest(&path)
            .await
            .with_context(|| format!("Failed to ingest {}", path.display()))?;
        Ok(vec![progress])
    })
    .await?;
    output(&report, json_mode);
    Ok(())
}

pub async fn execute_extract(args: ExtractArgs, ctx: &CommandContext, json_mode: bool) -> Result<()> {
    let replay = ReplayExtractor::from_path(&args.replay)
        .await
        .with_context(|| format!("Failed to load replay file {}", args.replay.display()))?;
    let extractor = Arc::new(RetryingExtractor::new(
        replay,
        RetryPolicy::from(&ctx.config.extraction),
    ));
    let filter = UnprocessedFilter {
        user_id: args.user.as_deref().map(parse_user_id),
        limit: args.limit,
    };

    let report = run_stage(
        ctx,
        json_mode,
        |p| p.with_extractor(extractor),
        |pipeline| async move {
            let progress = pipeline
                .run_extract(filter)
                .await
                .context("Extraction failed")?;
            Ok(vec![progress])
        },
    )
    .await?;
    output(&report, json_mode);
    Ok(())
}

pub async fn execute_aggregate(
    args: AggregateArgs,
    ctx: &CommandContext,
    json_mode: bool,
) -> Result<()> {
    let user = args.user.as_deref().map(parse_user_id);
    let report = run_stage(ctx, json_mode, |p| p, |pipeline| async move {
        let progress = pipeline
            .run_aggregate(user)
            .await
            .context("Aggregation failed")?;
        Ok(vec![progress])
    })
    .await?;
    output(&report, json_mode);
    Ok(())
}

pub async fn execute_recompute(
    args: RecomputeArgs,
    ctx: &CommandContext,
    json_mode: bool,
) -> Result<()> {
    let users = args.user.as_deref().map(|u| vec![parse_user_id(u)]);
    let report = run_stage(ctx, json_mode, |p| p, |pipeline| async move {
        let progress = pipeline
            .run_recompute(users)
            .await
            .context("Recompute failed")?;
        Ok(vec![progress])
    })
    .await?;
    output(&report, json_mode);
    Ok(())
}
