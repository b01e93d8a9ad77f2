//! Profile inspection and trait resolution commands.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use super::{parse_user_id, CommandContext};
use crate::cli::output::{output, table, CommandOutput};
use crate::domain::models::{FieldKey, Profile, Score};
use crate::domain::ports::ProfileRepository;
use crate::services::{ProfileEngine, ResolvedTrait, ScoreCalculator};

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// User id
    pub user: String,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// User id
    pub user: String,
    /// Field to resolve, as "signal_type.field"
    #[arg(short, long, default_value = "temperament.score")]
    pub field: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileOutput {
    pub profile: Profile,
    pub scores: Vec<Score>,
}

impl CommandOutput for ProfileOutput {
    fn to_human(&self) -> String {
        let p = &self.profile;
        let mut lines = vec![
            format!("Profile for user {}", p.user_id),
            format!("Version: {}", p.profile_version),
            format!("Updated: {}", p.updated_at.format("%Y-%m-%d %H:%M:%S UTC")),
            format!(
                "Language: {}",
                p.primary_language.as_deref().unwrap_or("unknown")
            ),
            format!(
                "Arc: {}",
                p.current_arc.map_or_else(|| "-".to_string(), |a| a.to_string())
            ),
            String::new(),
            format!("Temperament: {}", p.temperament.summary),
            format!("Communication: {}", p.communication_style.summary),
            format!("Sentiment: {}", p.sentiment_trend.summary),
            format!(
                "Life stage: {} ({:.0}% confidence)",
                p.life_stage.stage,
                p.life_stage.confidence * 100.0
            ),
        ];
        if !p.topic_interests.primary.is_empty() {
            lines.push(format!("Topics: {}", p.topic_interests.primary.join(", ")));
        }
        lines.push(format!(
            "Analyzed: {} conversations, {} signals",
            p.interaction_stats.total_conversations_analyzed, p.interaction_stats.total_signals
        ));

        if !self.scores.is_empty() {
            let mut t = table(["Dimension", "Score", "Scored"]);
            for score in &self.scores {
                t.add_row(vec![
                    Cell::new(&score.dimension),
                    Cell::new(format!("{:.1}", score.score)),
                    Cell::new(score.scored_at.format("%Y-%m-%d %H:%M")),
                ]);
            }
            lines.push(String::new());
            lines.push(t.to_string());
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct ResolveOutput {
    pub user_id: String,
    pub field: String,
    #[serde(flatten)]
    pub resolved: ResolvedTrait,
}

impl CommandOutput for ResolveOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("{} for user {}", self.field, self.user_id),
            format!("Value: {:.2}", self.resolved.value),
            format!("Confidence: {:.2}", self.resolved.confidence),
            format!("Volatility: {}", self.resolved.volatility),
        ];
        if let Some(divergence) = self.resolved.divergence {
            lines.push(format!("Divergence: {}", divergence.as_str()));
        }
        if !self.resolved.note.is_empty() {
            lines.push(format!("Note: {}", self.resolved.note));
        }
        lines.join("\n")
    }
}

pub async fn execute_profile(args: ProfileArgs, ctx: &CommandContext, json_mode: bool) -> Result<()> {
    let user_id = parse_user_id(&args.user);
    let profile = ctx
        .store
        .get_profile(user_id)
        .await
        .context("Failed to load profile")?
        .ok_or_else(|| anyhow!("No profile for user {}", args.user))?;
    let scores = ScoreCalculator::with_config(ctx.store.clone(), &ctx.config.scoring)
        .current_scores(user_id)
        .await
        .context("Failed to load scores")?;

    output(&ProfileOutput { profile, scores }, json_mode);
    Ok(())
}

pub async fn execute_resolve(args: ResolveArgs, ctx: &CommandContext, json_mode: bool) -> Result<()> {
    let user_id = parse_user_id(&args.user);
    let field = FieldKey::parse(&args.field)
        .ok_or_else(|| anyhow!("Invalid field '{}': expected \"signal_type.field\"", args.field))?;

    let engine = ProfileEngine::with_config(ctx.store.clone(), &ctx.config);
    let resolved = engine
        .resolve_trait(user_id, field)
        .await
        .context("Failed to resolve trait")?;

    output(
        &ResolveOutput {
            user_id: user_id.to_string(),
            field: field.as_key(),
            resolved,
        },
        json_mode,
    );
    Ok(())
}
