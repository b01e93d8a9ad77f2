//! Bounded, decaying, explainable fit scores.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DimensionConfig, Score, ScoreComponent, ScoringConfig, Signal};
use crate::domain::ports::{ScoreRepository, SignalOrder, SignalRepository};
use crate::services::dimensions::{weighted_fields, DimensionCatalog};
use crate::services::reasoning::{default_reasoning, generate_reasoning};
use crate::services::temporal::{recency_weight, round_to};

/// Pure scoring over already-loaded signals and history.
#[derive(Debug, Clone)]
pub struct ScoreEngine {
    catalog: DimensionCatalog,
    decay_lambda: f64,
    max_components: usize,
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

impl ScoreEngine {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            catalog: DimensionCatalog::new(config.dimensions.clone()),
            decay_lambda: config.decay_lambda,
            max_components: config.max_components,
        }
    }

    pub fn catalog(&self) -> &DimensionCatalog {
        &self.catalog
    }

    /// Score one dimension.
    ///
    /// `signals` may contain any types; only the dimension's types count.
    /// `previous` is the latest earlier score of the same dimension.
    pub fn score_dimension(
        &self,
        user_id: Uuid,
        dimension: &DimensionConfig,
        signals: &[Signal],
        previous: Option<f64>,
        now: DateTime<Utc>,
    ) -> Score {
        let relevant: Vec<&Signal> = signals
            .iter()
            .filter(|s| dimension.signal_types.contains(&s.signal_type()))
            .collect();

        if relevant.is_empty() {
            return Score {
                id: Uuid::new_v4(),
                user_id,
                dimension: dimension.name.clone(),
                score: dimension.default_score,
                previous_score: previous,
                reasoning: default_reasoning(&dimension.name),
                components: Vec::new(),
                scored_at: now,
            };
        }

        let fields = weighted_fields(dimension);
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        let mut components = Vec::new();

        for signal in relevant {
            let days_ago = signal.age_days(now);
            let decay = recency_weight(days_ago, self.decay_lambda);

            for (field, field_weight) in &fields {
                let Some(value) = field.scaled_value(&signal.value) else {
                    continue;
                };
                let weight = decay * signal.confidence * field_weight;
                if !weight.is_finite() {
                    continue;
                }
                weighted_sum += value * weight;
                total_weight += weight;
                components.push(ScoreComponent {
                    signal_id: signal.id,
                    key: field.as_key(),
                    value: round_to(value, 2),
                    weight: round_to(weight, 4),
                    days_ago: round_to(days_ago, 1),
                });
            }
        }

        let raw = Some(weighted_sum / total_weight)
            .filter(|v| total_weight > 0.0 && v.is_finite())
            .unwrap_or(dimension.default_score);
        let score = round_to(raw.clamp(dimension.min_score, dimension.max_score), 1)
            .clamp(dimension.min_score, dimension.max_score);

        let reasoning =
            generate_reasoning(&dimension.display_label(), score, previous, &components);

        components.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        components.truncate(self.max_components);

        Score {
            id: Uuid::new_v4(),
            user_id,
            dimension: dimension.name.clone(),
            score,
            previous_score: previous,
            reasoning,
            components,
            scored_at: now,
        }
    }

    /// Score every configured dimension. `history` is ordered newest first.
    pub fn score_all(
        &self,
        user_id: Uuid,
        signals: &[Signal],
        history: &[Score],
        now: DateTime<Utc>,
    ) -> Vec<Score> {
        self.catalog
            .iter()
            .map(|dimension| {
                let previous = latest_score(history, &dimension.name);
                self.score_dimension(user_id, dimension, signals, previous, now)
            })
            .collect()
    }
}

/// Most recent score value of `dimension` in a newest-first history.
pub fn latest_score(history: &[Score], dimension: &str) -> Option<f64> {
    history
        .iter()
        .find(|s| s.dimension == dimension)
        .map(|s| s.score)
}

/// Score calculation service: loads signals and history, appends new scores.
pub struct ScoreCalculator<R>
where
    R: SignalRepository + ScoreRepository,
{
    repository: Arc<R>,
    engine: ScoreEngine,
}

impl<R> ScoreCalculator<R>
where
    R: SignalRepository + ScoreRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_config(repository, &ScoringConfig::default())
    }

    pub fn with_config(repository: Arc<R>, config: &ScoringConfig) -> Self {
        Self {
            repository,
            engine: ScoreEngine::new(config),
        }
    }

    pub fn engine(&self) -> &ScoreEngine {
        &self.engine
    }

    pub async fn compute_score(&self, user_id: Uuid, dimension: &str) -> DomainResult<Score> {
        self.compute_score_at(user_id, dimension, Utc::now()).await
    }

    /// Compute and append one dimension's score.
    ///
    /// Fails with `UnknownDimension` before touching the store when the
    /// name is not configured.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn compute_score_at(
        &self,
        user_id: Uuid,
        dimension: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Score> {
        let config = self.engine.catalog().get(dimension)?;
        let signals = self
            .repository
            .list_signals(user_id, Some(config.signal_types.as_slice()), SignalOrder::NewestFirst)
            .await?;
        let history = self.repository.list_scores(user_id, Some(dimension)).await?;

        let score = self.engine.score_dimension(
            user_id,
            config,
            &signals,
            latest_score(&history, dimension),
            now,
        );
        self.repository.append_score(&score).await?;

        debug!(dimension, score = score.score, "score computed");
        Ok(score)
    }

    pub async fn compute_all_scores(&self, user_id: Uuid) -> DomainResult<Vec<Score>> {
        self.compute_all_scores_at(user_id, Utc::now()).await
    }

    /// Compute every configured dimension and append them together.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn compute_all_scores_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Score>> {
        let signals = self
            .repository
            .list_signals(user_id, None, SignalOrder::NewestFirst)
            .await?;
        let history = self.repository.list_scores(user_id, None).await?;

        let scores = self.engine.score_all(user_id, &signals, &history, now);
        self.repository.append_scores(&scores).await?;

        debug!(dimensions = scores.len(), "scores computed");
        Ok(scores)
    }

    /// Latest score per configured dimension, if any was ever computed.
    pub async fn current_scores(&self, user_id: Uuid) -> DomainResult<Vec<Score>> {
        let history = self.repository.list_scores(user_id, None).await?;
        Ok(self
            .engine
            .catalog()
            .iter()
            .filter_map(|d| history.iter().find(|s| s.dimension == d.name).cloned())
            .collect())
    }
}
