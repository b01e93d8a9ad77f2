use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use super::{parse_user_id, CommandContext};
use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::domain::models::Score;
use crate::services::ScoreCalculator;

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// User id
    pub user: String,
    /// Only this dimension (defaults to all configured dimensions)
    #[arg(short, long)]
    pub dimension: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScoreListOutput {
    pub user_id: String,
    pub scores: Vec<Score>,
}

impl CommandOutput for ScoreListOutput {
    fn to_human(&self) -> String {
        if self.scores.is_empty() {
            return format!("No scores for user {}.", self.user_id);
        }
        let mut t = table(["Dimension", "Score", "Previous", "Reasoning"]);
        for score in &self.scores {
            t.add_row(vec![
                Cell::new(&score.dimension),
                Cell::new(format!("{:.1}", score.score)),
                Cell::new(
                    score
                        .previous_score
                        .map_or_else(|| "-".to_string(), |p| format!("{p:.1}")),
                ),
                Cell::new(truncate(&score.reasoning, 120)),
            ]);
        }
        format!("Scores for user {}:\n{t}", self.user_id)
    }
}

pub async fn execute(args: ScoreArgs, ctx: &CommandContext, json_mode: bool) -> Result<()> {
    let user_id = parse_user_id(&args.user);
    let calculator = ScoreCalculator::with_config(ctx.store.clone(), &ctx.config.scoring);

    let scores = match args.dimension {
        Some(dimension) => vec![calculator
            .compute_score(user_id, &dimension)
            .await
            .with_context(|| format!("Failed to score dimension '{dimension}'"))?],
        None => calculator
            .compute_all_scores(user_id)
            .await
            .context("Failed to compute scores")?,
    };

    output(
        &ScoreListOutput {
            user_id: user_id.to_string(),
            scores,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_human_output_shows_previous_score() {
        let user = Uuid::new_v4();
        let out = ScoreListOutput {
            user_id: user.to_string(),
            scores: vec![Score {
                id: Uuid::new_v4(),
                user_id: user,
                dimension: "escalation_risk".to_string(),
                score: 22.04,
                previous_score: Some(30.0),
                reasoning: "Escalation risk is low at 22/100.".to_string(),
                components: Vec::new(),
                scored_at: Utc::now(),
            }],
        };
        let human = out.to_human();
        assert!(human.contains("escalation_risk"));
        assert!(human.contains("22.0"));
        assert!(human.contains("30.0"));
    }
}
