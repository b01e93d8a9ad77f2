//! SQLite implementation of the UserStateRepository.

use async_trait::async_trait;

use super::profile_repository::write_profile;
use super::score_repository::insert_score;
use super::snapshot_repository::insert_snapshot;
use super::SqliteStore;
use crate::domain::errors::DomainResult;
use crate::domain::ports::{UserStateRepository, UserStateUpdate};

#[async_trait]
impl UserStateRepository for SqliteStore {
    async fn commit_user_state(&self, update: &UserStateUpdate) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        write_profile(&mut tx, &update.profile, false).await?;
        for score in &update.scores {
            insert_score(&mut tx, score).await?;
        }
        if let Some(snapshot) = &update.snapshot {
            insert_snapshot(&mut tx, snapshot).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{Profile, Score, Snapshot};
    use crate::domain::ports::{ProfileRepository, ScoreRepository, SnapshotRepository};
    use chrono::Utc;
    use uuid::Uuid;

    fn score(user: Uuid, id: Uuid) -> Score {
        Score {
            id,
            user_id: user,
            dimension: "responsiveness".to_string(),
            score: 61.5,
            previous_score: Some(50.0),
            reasoning: "Responsiveness is moderate at 62/100.".to_string(),
            components: Vec::new(),
            scored_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_commit_writes_everything() {
        let store = SqliteStore::new(create_migrated_test_pool().await.unwrap());
        let user = Uuid::new_v4();
        let mut profile = store.get_or_create_profile(user).await.unwrap();
        profile.profile_version = 1;
        let scores = vec![score(user, Uuid::new_v4())];
        let snapshot = Snapshot::capture(&profile, &scores, Utc::now());

        store
            .commit_user_state(&UserStateUpdate {
                profile: profile.clone(),
                scores,
                snapshot: Some(snapshot),
            })
            .await
            .unwrap();

        assert_eq!(
            store.get_profile(user).await.unwrap().unwrap().profile_version,
            1
        );
        assert_eq!(store.list_scores(user, None).await.unwrap().len(), 1);
        let snapshots = store.list_snapshots(user, None).await.unwrap();
        assert_eq!(snapshots[0].data.scores["responsiveness"].score, 61.5);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_nothing_behind() {
        let store = SqliteStore::new(create_migrated_test_pool().await.unwrap());
        let user = Uuid::new_v4();
        let profile = Profile::new(user, Utc::now());
        let duplicate = Uuid::new_v4();

        // Two scores with the same primary key make the transaction fail midway.
        let result = store
            .commit_user_state(&UserStateUpdate {
                profile,
                scores: vec![score(user, duplicate), score(user, duplicate)],
                snapshot: None,
            })
            .await;
        assert!(result.is_err());

        assert!(store.get_profile(user).await.unwrap().is_none());
        assert!(store.list_scores(user, None).await.unwrap().is_empty());
    }
}
