//! Periodic immutable captures of profile state and timeline reconstruction.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{EvolutionConfig, Snapshot};
use crate::domain::ports::{ProfileRepository, ScoreRepository, SnapshotRepository};

/// Whether a snapshot is due given the latest one (if any).
pub fn snapshot_due(latest: Option<&Snapshot>, interval_days: i64, now: DateTime<Utc>) -> bool {
    match latest {
        None => true,
        Some(snapshot) => now - snapshot.snapshot_at >= Duration::days(interval_days),
    }
}

pub struct SnapshotManager<R>
where
    R: ProfileRepository + ScoreRepository + SnapshotRepository,
{
    repository: Arc<R>,
    interval_days: i64,
    timeline_limit: usize,
}

impl<R> SnapshotManager<R>
where
    R: ProfileRepository + ScoreRepository + SnapshotRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_config(repository, &EvolutionConfig::default())
    }

    pub fn with_config(repository: Arc<R>, config: &EvolutionConfig) -> Self {
        Self {
            repository,
            interval_days: config.snapshot_interval_days,
            timeline_limit: config.timeline_limit,
        }
    }

    pub fn interval_days(&self) -> i64 {
        self.interval_days
    }

    pub async fn should_snapshot(&self, user_id: Uuid) -> DomainResult<bool> {
        self.should_snapshot_at(user_id, self.interval_days, Utc::now())
            .await
    }

    /// True when the user has no snapshot or the latest is at least
    /// `interval_days` old.
    pub async fn should_snapshot_at(
        &self,
        user_id: Uuid,
        interval_days: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let latest = self.repository.list_snapshots(user_id, Some(1)).await?;
        Ok(snapshot_due(latest.first(), interval_days, now))
    }

    pub async fn create_snapshot(&self, user_id: Uuid) -> DomainResult<Option<Snapshot>> {
        self.create_snapshot_at(user_id, Utc::now()).await
    }

    /// Capture the profile and latest score per dimension. Returns `None`
    /// without writing anything when the user has no profile.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn create_snapshot_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Snapshot>> {
        let Some(profile) = self.repository.get_profile(user_id).await? else {
            warn!("cannot snapshot: no profile");
            return Ok(None);
        };
        let scores = self.repository.list_scores(user_id, None).await?;

        let snapshot = Snapshot::capture(&profile, &scores, now);
        self.repository.append_snapshot(&snapshot).await?;

        debug!(
            snapshot_id = %snapshot.id,
            scores = snapshot.data.scores.len(),
            "snapshot created"
        );
        Ok(Some(snapshot))
    }

    pub async fn get_timeline(&self, user_id: Uuid) -> DomainResult<Vec<Snapshot>> {
        self.get_timeline_limited(user_id, self.timeline_limit).await
    }

    /// The latest `limit` snapshots, oldest first.
    pub async fn get_timeline_limited(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> DomainResult<Vec<Snapshot>> {
        let mut snapshots = self.repository.list_snapshots(user_id, Some(limit)).await?;
        snapshots.reverse();
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::models::{BehavioralArc, Score};

    fn manager() -> (Arc<MemoryStore>, SnapshotManager<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), SnapshotManager::new(store))
    }

    #[tokio::test]
    async fn test_should_snapshot_lifecycle() {
        let (store, manager) = manager();
        let user = Uuid::new_v4();
        let now = Utc::now();
        store.get_or_create_profile(user).await.unwrap();

        assert!(manager.should_snapshot_at(user, 7, now).await.unwrap());
        manager.create_snapshot_at(user, now).await.unwrap().unwrap();
        assert!(!manager.should_snapshot_at(user, 7, now).await.unwrap());
        assert!(!manager
            .should_snapshot_at(user, 7, now + Duration::days(6))
            .await
            .unwrap());
        assert!(manager
            .should_snapshot_at(user, 7, now + Duration::days(7))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_create_snapshot_without_profile_is_noop() {
        let (store, manager) = manager();
        let user = Uuid::new_v4();
        assert!(manager.create_snapshot(user).await.unwrap().is_none());
        assert!(store.list_snapshots(user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_keeps_latest_score_per_dimension() {
        let (store, manager) = manager();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut profile = store.get_or_create_profile(user).await.unwrap();
        profile.current_arc = Some(BehavioralArc::Warming);
        store.save_profile(&profile).await.unwrap();

        let score = |value: f64, minutes: i64| Score {
            id: Uuid::new_v4(),
            user_id: user,
            dimension: "responsiveness".to_string(),
            score: value,
            previous_score: None,
            reasoning: format!("r{value}"),
            components: Vec::new(),
            scored_at: now - Duration::minutes(minutes),
        };
        store.append_score(&score(40.0, 10)).await.unwrap();
        store.append_score(&score(70.0, 1)).await.unwrap();

        let snapshot = manager.create_snapshot_at(user, now).await.unwrap().unwrap();
        assert_eq!(snapshot.arc_label, Some(BehavioralArc::Warming));
        assert_eq!(snapshot.data.scores.len(), 1);
        assert_eq!(snapshot.data.scores["responsiveness"].score, 70.0);
    }

    #[tokio::test]
    async fn test_timeline_is_chronological_and_limited() {
        let (store, manager) = manager();
        let user = Uuid::new_v4();
        let start = Utc::now() - Duration::days(30);
        store.get_or_create_profile(user).await.unwrap();

        for week in 0..4 {
            manager
                .create_snapshot_at(user, start + Duration::days(7 * week))
                .await
                .unwrap();
        }

        let timeline = manager.get_timeline(user).await.unwrap();
        assert_eq!(timeline.len(), 4);
        assert!(timeline.windows(2).all(|w| w[0].snapshot_at < w[1].snapshot_at));

        let latest_two = manager.get_timeline_limited(user, 2).await.unwrap();
        assert_eq!(latest_two.len(), 2);
        assert_eq!(latest_two[1].snapshot_at, start + Duration::days(21));
    }
}
