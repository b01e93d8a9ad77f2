//! Command-line interface: a thin shell over the library services.

pub mod commands;
pub mod output;
pub mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::evolution::{ArcArgs, SnapshotArgs, TimelineArgs};
use commands::pipeline::{AggregateArgs, ExtractArgs, IngestArgs, RecomputeArgs};
use commands::profile::{ProfileArgs, ResolveArgs};
use commands::score::ScoreArgs;

#[derive(Parser, Debug)]
#[command(name = "traitscope")]
#[command(about = "Behavioral signal aggregation, fit scoring and arc detection", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .traitscope/config.yaml)
    #[arg(short, long, global = true, env = "TRAITSCOPE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a JSONL conversation dataset
    Ingest(IngestArgs),
    /// Extract signals from unprocessed conversations
    Extract(ExtractArgs),
    /// Rebuild profiles from stored signals
    Aggregate(AggregateArgs),
    /// Compute fit scores for a user
    Score(ScoreArgs),
    /// Detect a user's behavioral arc
    Arc(ArcArgs),
    /// Take a profile snapshot when one is due
    Snapshot(SnapshotArgs),
    /// Show a user's snapshot timeline
    Timeline(TimelineArgs),
    /// Recompute profile, scores, arc and snapshot per user
    Recompute(RecomputeArgs),
    /// Show a user's profile and latest scores
    Profile(ProfileArgs),
    /// Conflict-resolved reading of one trait field
    Resolve(ResolveArgs),
}

/// Print an error in the selected mode and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": causes,
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
