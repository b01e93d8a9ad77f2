//! SQLite implementation of the ScoreRepository.

use async_trait::async_trait;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_json, parse_uuid, SqliteStore};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Score;
use crate::domain::ports::ScoreRepository;

pub(super) async fn insert_score(conn: &mut SqliteConnection, score: &Score) -> DomainResult<()> {
    let components_json = serde_json::to_string(&score.components)?;

    sqlx::query(
        r#"INSERT INTO scores (id, user_id, dimension, score, previous_score, reasoning, components, scored_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(score.id.to_string())
    .bind(score.user_id.to_string())
    .bind(&score.dimension)
    .bind(score.score)
    .bind(score.previous_score)
    .bind(&score.reasoning)
    .bind(&components_json)
    .bind(format_datetime(&score.scored_at))
    .execute(conn)
    .await?;

    Ok(())
}

#[async_trait]
impl ScoreRepository for SqliteStore {
    async fn list_scores(
        &self,
        user_id: Uuid,
        dimension: Option<&str>,
    ) -> DomainResult<Vec<Score>> {
        let rows: Vec<ScoreRow> = sqlx::query_as(
            r#"SELECT id, user_id, dimension, score, previous_score, reasoning, components, scored_at
               FROM scores
               WHERE user_id = ?1 AND (?2 IS NULL OR dimension = ?2)
               ORDER BY scored_at DESC, rowid DESC"#,
        )
        .bind(user_id.to_string())
        .bind(dimension)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn append_score(&self, score: &Score) -> DomainResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_score(&mut conn, score).await
    }

    async fn append_scores(&self, scores: &[Score]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        for score in scores {
            insert_score(&mut tx, score).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ScoreRow {
    id: String,
    user_id: String,
    dimension: String,
    score: f64,
    previous_score: Option<f64>,
    reasoning: String,
    components: String,
    scored_at: String,
}

impl TryFrom<ScoreRow> for Score {
    type Error = DomainError;

    fn try_from(row: ScoreRow) -> Result<Self, Self::Error> {
        Ok(Score {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            dimension: row.dimension,
            score: row.score,
            previous_score: row.previous_score,
            reasoning: row.reasoning,
            components: parse_json(&row.components)?,
            scored_at: parse_datetime(&row.scored_at)?,
        })
    }
}
