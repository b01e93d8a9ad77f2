//! SQLite implementation of the ProfileRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_json, parse_uuid, SqliteStore};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BehavioralArc, Profile};
use crate::domain::ports::ProfileRepository;

const PROFILE_COLUMNS: &str = "user_id, temperament, communication_style, sentiment_trend, life_stage, topic_interests, interaction_stats, primary_language, current_arc, profile_version, created_at, updated_at";

/// Insert a profile, replacing any existing row for the user unless
/// `keep_existing` is set.
pub(super) async fn write_profile(
    conn: &mut SqliteConnection,
    profile: &Profile,
    keep_existing: bool,
) -> DomainResult<()> {
    let version = i64::try_from(profile.profile_version)
        .map_err(|e| DomainError::ValidationFailed(format!("profile version: {e}")))?;
    let verb = if keep_existing {
        "INSERT OR IGNORE"
    } else {
        "INSERT OR REPLACE"
    };

    sqlx::query(&format!(
        "{verb} INTO profiles ({PROFILE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(profile.user_id.to_string())
    .bind(serde_json::to_string(&profile.temperament)?)
    .bind(serde_json::to_string(&profile.communication_style)?)
    .bind(serde_json::to_string(&profile.sentiment_trend)?)
    .bind(serde_json::to_string(&profile.life_stage)?)
    .bind(serde_json::to_string(&profile.topic_interests)?)
    .bind(serde_json::to_string(&profile.interaction_stats)?)
    .bind(&profile.primary_language)
    .bind(profile.current_arc.map(|a| a.as_str()))
    .bind(version)
    .bind(format_datetime(&profile.created_at))
    .bind(format_datetime(&profile.updated_at))
    .execute(conn)
    .await?;

    Ok(())
}

pub(super) async fn fetch_profile(
    conn: &mut SqliteConnection,
    user_id: Uuid,
) -> DomainResult<Option<Profile>> {
    let row: Option<ProfileRow> =
        sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?"))
            .bind(user_id.to_string())
            .fetch_optional(conn)
            .await?;

    row.map(TryInto::try_into).transpose()
}

#[async_trait]
impl ProfileRepository for SqliteStore {
    async fn get_profile(&self, user_id: Uuid) -> DomainResult<Option<Profile>> {
        let mut conn = self.pool.acquire().await?;
        fetch_profile(&mut conn, user_id).await
    }

    async fn get_or_create_profile(&self, user_id: Uuid) -> DomainResult<Profile> {
        let mut tx = self.pool.begin().await?;
        write_profile(&mut tx, &Profile::new(user_id, Utc::now()), true).await?;
        let profile = fetch_profile(&mut tx, user_id)
            .await?
            .ok_or(DomainError::ProfileNotFound(user_id))?;
        tx.commit().await?;
        Ok(profile)
    }

    async fn save_profile(&self, profile: &Profile) -> DomainResult<()> {
        let mut conn = self.pool.acquire().await?;
        write_profile(&mut conn, profile, false).await
    }

    async fn list_user_ids(&self) -> DomainResult<Vec<Uuid>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT user_id FROM profiles ORDER BY user_id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|(id,)| parse_uuid(id)).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    temperament: String,
    communication_style: String,
    sentiment_trend: String,
    life_stage: String,
    topic_interests: String,
    interaction_stats: String,
    primary_language: Option<String>,
    current_arc: Option<String>,
    profile_version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let current_arc = row
            .current_arc
            .map(|s| {
                BehavioralArc::from_str(&s)
                    .ok_or_else(|| DomainError::SerializationError(format!("Invalid arc: {s}")))
            })
            .transpose()?;

        Ok(Profile {
            user_id: parse_uuid(&row.user_id)?,
            temperament: parse_json(&row.temperament)?,
            communication_style: parse_json(&row.communication_style)?,
            sentiment_trend: parse_json(&row.sentiment_trend)?,
            life_stage: parse_json(&row.life_stage)?,
            topic_interests: parse_json(&row.topic_interests)?,
            interaction_stats: parse_json(&row.interaction_stats)?,
            primary_language: row.primary_language,
            current_arc,
            profile_version: u64::try_from(row.profile_version)
                .map_err(|e| DomainError::SerializationError(e.to_string()))?,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_store() -> SqliteStore {
        SqliteStore::new(create_migrated_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_get_or_create_persists_default_profile() {
        let store = setup_store().await;
        let user = Uuid::new_v4();
        assert!(store.get_profile(user).await.unwrap().is_none());

        let created = store.get_or_create_profile(user).await.unwrap();
        assert_eq!(created.profile_version, 0);
        assert_eq!(created.temperament.summary, "No data");

        let again = store.get_or_create_profile(user).await.unwrap();
        assert_eq!(again.created_at, created.created_at);
        assert_eq!(store.list_user_ids().await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn test_save_profile_replaces_row() {
        let store = setup_store().await;
        let user = Uuid::new_v4();
        let mut profile = store.get_or_create_profile(user).await.unwrap();

        profile.profile_version = 3;
        profile.current_arc = Some(BehavioralArc::Growth);
        profile.temperament.score = 8.5;
        profile.topic_interests.primary = vec!["rust".to_string()];
        profile.primary_language = Some("English".to_string());
        store.save_profile(&profile).await.unwrap();

        let stored = store.get_profile(user).await.unwrap().unwrap();
        assert_eq!(stored, profile);
    }
}
