//! Arc detection, snapshot and timeline commands.

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use super::{parse_user_id, CommandContext};
use crate::cli::output::{output, table, CommandOutput};
use crate::domain::models::{ArcReport, Snapshot, SubArc};
use crate::services::{ArcDetector, SnapshotManager};

#[derive(Args, Debug)]
pub struct ArcArgs {
    /// User id
    pub user: String,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// User id
    pub user: String,
    /// Snapshot even if the interval has not elapsed
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// User id
    pub user: String,
    /// Maximum number of snapshots (defaults to evolution.timeline_limit)
    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ArcOutput {
    pub user_id: String,
    #[serde(flatten)]
    pub report: ArcReport,
}

fn sub_arc_row(name: &str, sub: &SubArc) -> Vec<Cell> {
    let mean = |m: Option<f64>| m.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
    vec![
        Cell::new(name),
        Cell::new(format!("{:?}", sub.direction).to_lowercase()),
        Cell::new(format!("{:.2}", sub.magnitude)),
        Cell::new(if sub.shift_detected { "yes" } else { "no" }),
        Cell::new(mean(sub.historical_mean)),
        Cell::new(mean(sub.recent_mean)),
    ]
}

impl CommandOutput for ArcOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("User: {}", self.user_id),
            format!(
                "Arc: {} ({:.0}% confidence)",
                self.report.arc,
                self.report.confidence * 100.0
            ),
            format!("Pattern: {}", self.report.detail),
        ];
        match &self.report.sub_arcs {
            Some(subs) => {
                let mut t = table(["Trait", "Direction", "Magnitude", "Shift", "Historical", "Recent"]);
                t.add_row(sub_arc_row("temperament", &subs.temperament));
                t.add_row(sub_arc_row("engagement", &subs.engagement));
                t.add_row(sub_arc_row("expertise", &subs.expertise));
                lines.push(t.to_string());
            }
            None => lines.push("Not enough signals for trend analysis.".to_string()),
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotOutput {
    pub user_id: String,
    pub created: bool,
    pub message: String,
    pub snapshot: Option<Snapshot>,
}

impl CommandOutput for SnapshotOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

#[derive(Debug, Serialize)]
pub struct TimelineOutput {
    pub user_id: String,
    pub snapshots: Vec<Snapshot>,
}

impl CommandOutput for TimelineOutput {
    fn to_human(&self) -> String {
        if self.snapshots.is_empty() {
            return format!("No snapshots for user {}.", self.user_id);
        }

        let dimensions: Vec<String> = self
            .snapshots
            .iter()
            .flat_map(|s| s.data.scores.keys().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut headers = vec!["Taken".to_string(), "Arc".to_string(), "Temperament".to_string()];
        headers.extend(dimensions.iter().cloned());
        let mut t = table(headers);

        for snapshot in &self.snapshots {
            let mut row = vec![
                snapshot.snapshot_at.format("%Y-%m-%d %H:%M").to_string(),
                snapshot
                    .arc_label
                    .map_or_else(|| "-".to_string(), |a| a.to_string()),
                format!("{:.1}", snapshot.data.temperament.score),
            ];
            for dimension in &dimensions {
                row.push(
                    snapshot
                        .data
                        .scores
                        .get(dimension)
                        .map_or_else(|| "-".to_string(), |s| format!("{:.1}", s.score)),
                );
            }
            t.add_row(row);
        }
        format!("Timeline for user {} (oldest first):\n{t}", self.user_id)
    }
}

pub async fn execute_arc(args: ArcArgs, ctx: &CommandContext, json_mode: bool) -> Result<()> {
    let user_id = parse_user_id(&args.user);
    let detector = ArcDetector::with_config(ctx.store.clone(), &ctx.config.evolution);
    let report = detector
        .detect_arc(user_id)
        .await
        .context("Failed to detect arc")?;
    output(
        &ArcOutput {
            user_id: user_id.to_string(),
            report,
        },
        json_mode,
    );
    Ok(())
}

pub async fn execute_snapshot(
    args: SnapshotArgs,
    ctx: &CommandContext,
    json_mode: bool,
) -> Result<()> {
    let user_id = parse_user_id(&args.user);
    let manager = SnapshotManager::with_config(ctx.store.clone(), &ctx.config.evolution);

    let due = manager
        .should_snapshot(user_id)
        .await
        .context("Failed to check snapshot schedule")?;
    let out = if args.force || due {
        let snapshot = manager
            .create_snapshot(user_id)
            .await
            .context("Failed to create snapshot")?;
        match snapshot {
            Some(snapshot) => SnapshotOutput {
                user_id: user_id.to_string(),
                created: true,
                message: format!("Snapshot {} taken for user {user_id}", snapshot.id),
                snapshot: Some(snapshot),
            },
            None => SnapshotOutput {
                user_id: user_id.to_string(),
                created: false,
                message: format!("User {user_id} has no profile; nothing to snapshot"),
                snapshot: None,
            },
        }
    } else {
        SnapshotOutput {
            user_id: user_id.to_string(),
            created: false,
            message: format!(
                "Latest snapshot is younger than {} days; use --force to snapshot anyway",
                manager.interval_days()
            ),
            snapshot: None,
        }
    };
    output(&out, json_mode);
    Ok(())
}

pub async fn execute_timeline(
    args: TimelineArgs,
    ctx: &CommandContext,
    json_mode: bool,
) -> Result<()> {
    let user_id = parse_user_id(&args.user);
    let manager = SnapshotManager::with_config(ctx.store.clone(), &ctx.config.evolution);
    let snapshots = match args.limit {
        Some(limit) => manager.get_timeline_limited(user_id, limit).await,
        None => manager.get_timeline(user_id).await,
    }
    .context("Failed to load timeline")?;

    output(
        &TimelineOutput {
            user_id: user_id.to_string(),
            snapshots,
        },
        json_mode,
    );
    Ok(())
}
