//! SQLite implementation of the ConversationRepository.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::profile_repository::write_profile;
use super::signal_repository::insert_signal;
use super::{format_datetime, limit_value, parse_datetime, parse_json, parse_uuid, SqliteStore};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Conversation, Profile, Signal};
use crate::domain::ports::{ConversationRepository, UnprocessedFilter};

const CONVERSATION_COLUMNS: &str =
    "conversation_id, user_id, model, language, total_turns, messages, processed, created_at";

#[async_trait]
impl ConversationRepository for SqliteStore {
    async fn insert_conversations(&self, conversations: &[Conversation]) -> DomainResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for conversation in conversations {
            let messages_json = serde_json::to_string(&conversation.messages)?;
            let result = sqlx::query(&format!(
                "INSERT OR IGNORE INTO conversations ({CONVERSATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
            ))
            .bind(conversation.conversation_id.to_string())
            .bind(conversation.user_id.to_string())
            .bind(&conversation.model)
            .bind(&conversation.language)
            .bind(conversation.total_turns)
            .bind(&messages_json)
            .bind(conversation.processed)
            .bind(format_datetime(&conversation.created_at))
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                continue;
            }
            inserted += 1;

            write_profile(&mut tx, &Profile::new(conversation.user_id, Utc::now()), true).await?;
            if let Some(language) = &conversation.language {
                sqlx::query(
                    "UPDATE profiles SET primary_language = ? WHERE user_id = ? AND primary_language IS NULL",
                )
                .bind(language)
                .bind(conversation.user_id.to_string())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn get_conversation(&self, conversation_id: Uuid) -> DomainResult<Option<Conversation>> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE conversation_id = ?"
        ))
        .bind(conversation_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_unprocessed(&self, filter: UnprocessedFilter) -> DomainResult<Vec<Conversation>> {
        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE processed = 0 AND (?1 IS NULL OR user_id = ?1)
             ORDER BY created_at ASC, conversation_id ASC LIMIT ?2"
        ))
        .bind(filter.user_id.map(|id| id.to_string()))
        .bind(limit_value(filter.limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn record_extraction(
        &self,
        conversation_id: Uuid,
        signals: &[Signal],
    ) -> DomainResult<bool> {
        let mut tx = self.pool.begin().await?;
        let claimed = sqlx::query(
            "UPDATE conversations SET processed = 1 WHERE conversation_id = ? AND processed = 0",
        )
        .bind(conversation_id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if claimed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for signal in signals {
            insert_signal(&mut tx, signal).await?;
        }
        tx.commit().await?;
        Ok(true)
    }
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    conversation_id: String,
    user_id: String,
    model: Option<String>,
    language: Option<String>,
    total_turns: i64,
    messages: String,
    processed: bool,
    created_at: String,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = DomainError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        Ok(Conversation {
            conversation_id: parse_uuid(&row.conversation_id)?,
            user_id: parse_uuid(&row.user_id)?,
            model: row.model,
            language: row.language,
            total_turns: row.total_turns,
            messages: parse_json(&row.messages)?,
            processed: row.processed,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}
