//! Per-user recompute: aggregate, score, detect the arc and snapshot, then
//! commit everything in one store transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ArcReport, Config, FieldKey, Profile, Score, Signal, Snapshot};
use crate::domain::ports::{BehaviorStore, SignalOrder, UserStateUpdate};
use crate::services::arc_detector::ArcAnalyzer;
use crate::services::conflict_resolver::{ConflictResolver, ResolvedTrait};
use crate::services::profile_aggregator::build_profile;
use crate::services::score_calculator::ScoreEngine;
use crate::services::snapshot_manager::snapshot_due;

/// Everything one recompute produced and committed.
#[derive(Debug, Clone, Serialize)]
pub struct RecomputeOutcome {
    pub profile: Profile,
    pub scores: Vec<Score>,
    pub arc: ArcReport,
    pub snapshot: Option<Snapshot>,
}

pub struct ProfileEngine<R: BehaviorStore> {
    repository: Arc<R>,
    scoring: ScoreEngine,
    arcs: ArcAnalyzer,
    resolver: ConflictResolver,
    snapshot_interval_days: i64,
}

impl<R: BehaviorStore> ProfileEngine<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_config(repository, &Config::default())
    }

    pub fn with_config(repository: Arc<R>, config: &Config) -> Self {
        Self {
            repository,
            scoring: ScoreEngine::new(&config.scoring),
            arcs: ArcAnalyzer::new(&config.evolution),
            resolver: ConflictResolver::new(&config.evolution),
            snapshot_interval_days: config.evolution.snapshot_interval_days,
        }
    }

    pub async fn recompute_user(&self, user_id: Uuid) -> DomainResult<RecomputeOutcome> {
        self.recompute_user_at(user_id, Utc::now()).await
    }

    /// Rebuild the profile, append a score per dimension, refresh the arc
    /// and take a snapshot when one is due.
    ///
    /// Nothing is written until the final commit, so a failure at any step
    /// leaves the user's stored state untouched.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn recompute_user_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<RecomputeOutcome> {
        let signals = self
            .repository
            .list_signals(user_id, None, SignalOrder::OldestFirst)
            .await?;
        let base = self
            .repository
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| Profile::new(user_id, now));
        let history = self.repository.list_scores(user_id, None).await?;
        let latest_snapshot = self.repository.list_snapshots(user_id, Some(1)).await?;

        let mut profile = build_profile(base, &signals, now);
        let scores = self.scoring.score_all(user_id, &signals, &history, now);

        let arc = self.arcs.analyze(&signals, now);
        if arc.sub_arcs.is_some() {
            profile.current_arc = Some(arc.arc);
        }

        let snapshot = if snapshot_due(latest_snapshot.first(), self.snapshot_interval_days, now) {
            Some(Snapshot::capture(&profile, &scores, now))
        } else {
            None
        };

        let update = UserStateUpdate {
            profile,
            scores,
            snapshot,
        };
        self.repository.commit_user_state(&update).await?;

        info!(
            version = update.profile.profile_version,
            signals = signals.len(),
            arc = %arc.arc,
            snapshot = update.snapshot.is_some(),
            "user recomputed"
        );

        let UserStateUpdate {
            profile,
            scores,
            snapshot,
        } = update;
        Ok(RecomputeOutcome {
            profile,
            scores,
            arc,
            snapshot,
        })
    }

    pub async fn resolve_trait(&self, user_id: Uuid, field: FieldKey) -> DomainResult<ResolvedTrait> {
        self.resolve_trait_at(user_id, field, Utc::now()).await
    }

    /// Conflict-resolved reading of one raw signal field.
    #[instrument(skip(self), fields(user_id = %user_id, field = %field.as_key()))]
    pub async fn resolve_trait_at(
        &self,
        user_id: Uuid,
        field: FieldKey,
        now: DateTime<Utc>,
    ) -> DomainResult<ResolvedTrait> {
        let signals = self
            .repository
            .list_signals(user_id, Some(&[field.signal_type]), SignalOrder::OldestFirst)
            .await?;
        let resolved = self
            .resolver
            .resolve(&signals, |s: &Signal| field.raw_value(&s.value), now);
        debug!(
            value = resolved.value,
            confidence = resolved.confidence,
            volatility = %resolved.volatility,
            "trait resolved"
        );
        Ok(resolved)
    }
}
