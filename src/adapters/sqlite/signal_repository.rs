//! SQLite implementation of the SignalRepository.

use async_trait::async_trait;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_json, parse_optional_uuid, parse_uuid, SqliteStore};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Signal, SignalType, SignalValue};
use crate::domain::ports::{SignalOrder, SignalRepository};

const SIGNAL_COLUMNS: &str =
    "id, user_id, conversation_id, signal_type, value, confidence, extracted_at, source_turn";

/// Insert one signal on an open connection or transaction.
pub(super) async fn insert_signal(conn: &mut SqliteConnection, signal: &Signal) -> DomainResult<()> {
    let payload = signal.value.payload_json()?;

    sqlx::query(
        r#"INSERT INTO signals (id, user_id, conversation_id, signal_type, value, confidence, extracted_at, source_turn)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(signal.id.to_string())
    .bind(signal.user_id.to_string())
    .bind(signal.conversation_id.map(|id| id.to_string()))
    .bind(signal.signal_type().as_str())
    .bind(payload.to_string())
    .bind(signal.confidence)
    .bind(format_datetime(&signal.extracted_at))
    .bind(signal.source_turn.map(i64::from))
    .execute(conn)
    .await?;

    Ok(())
}

#[async_trait]
impl SignalRepository for SqliteStore {
    async fn list_signals(
        &self,
        user_id: Uuid,
        types: Option<&[SignalType]>,
        order: SignalOrder,
    ) -> DomainResult<Vec<Signal>> {
        let mut query = format!("SELECT {SIGNAL_COLUMNS} FROM signals WHERE user_id = ?");
        let mut bindings: Vec<&'static str> = Vec::new();

        if let Some(types) = types {
            if types.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; types.len()].join(", ");
            query.push_str(&format!(" AND signal_type IN ({placeholders})"));
            bindings.extend(types.iter().map(SignalType::as_str));
        }

        query.push_str(match order {
            SignalOrder::OldestFirst => " ORDER BY extracted_at ASC, rowid ASC",
            SignalOrder::NewestFirst => " ORDER BY extracted_at DESC, rowid DESC",
        });

        let mut q = sqlx::query_as::<_, SignalRow>(&query).bind(user_id.to_string());
        for binding in bindings {
            q = q.bind(binding);
        }

        let rows: Vec<SignalRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn append_signal(&self, signal: &Signal) -> DomainResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_signal(&mut conn, signal).await
    }

    async fn append_signals(&self, signals: &[Signal]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        for signal in signals {
            insert_signal(&mut tx, signal).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct SignalRow {
    id: String,
    user_id: String,
    conversation_id: Option<String>,
    signal_type: String,
    value: String,
    confidence: f64,
    extracted_at: String,
    source_turn: Option<i64>,
}

impl TryFrom<SignalRow> for Signal {
    type Error = DomainError;

    fn try_from(row: SignalRow) -> Result<Self, Self::Error> {
        let signal_type = SignalType::from_str(&row.signal_type).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid signal type: {}", row.signal_type))
        })?;
        let payload: serde_json::Value = parse_json(&row.value)?;

        Ok(Signal {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            conversation_id: parse_optional_uuid(row.conversation_id)?,
            value: SignalValue::from_stored(signal_type, payload),
            confidence: row.confidence,
            extracted_at: parse_datetime(&row.extracted_at)?,
            source_turn: row.source_turn.and_then(|t| u32::try_from(t).ok()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{SentimentSignal, TemperamentSignal};
    use chrono::{Duration, Utc};

    async fn setup_store() -> SqliteStore {
        SqliteStore::new(create_migrated_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_append_and_list_in_order() {
        let store = setup_store().await;
        let user = Uuid::new_v4();
        let now = Utc::now();

        let old = Signal::new(
            user,
            SignalValue::Temperament(TemperamentSignal {
                score: 3.0,
                ..Default::default()
            }),
            0.9,
            now - Duration::days(10),
        )
        .with_conversation(Uuid::new_v4())
        .with_source_turn(4);
        let new = Signal::new(
            user,
            SignalValue::Sentiment(SentimentSignal::default()),
            0.5,
            now,
        );
        store.append_signals(&[new.clone(), old.clone()]).await.unwrap();

        let oldest_first = store
            .list_signals(user, None, SignalOrder::OldestFirst)
            .await
            .unwrap();
        assert_eq!(oldest_first.len(), 2);
        assert_eq!(oldest_first[0].id, old.id);
        assert_eq!(oldest_first[0].value, old.value);
        assert_eq!(oldest_first[0].source_turn, Some(4));
        assert_eq!(oldest_first[0].conversation_id, old.conversation_id);

        let newest_first = store
            .list_signals(user, None, SignalOrder::NewestFirst)
            .await
            .unwrap();
        assert_eq!(newest_first[0].id, new.id);
    }

    #[tokio::test]
    async fn test_list_filters_by_type() {
        let store = setup_store().await;
        let user = Uuid::new_v4();
        store
            .append_signal(&Signal::new(
                user,
                SignalValue::Sentiment(SentimentSignal::default()),
                0.5,
                Utc::now(),
            ))
            .await
            .unwrap();

        let only_temperament = store
            .list_signals(user, Some(&[SignalType::Temperament]), SignalOrder::OldestFirst)
            .await
            .unwrap();
        assert!(only_temperament.is_empty());

        let sentiment = store
            .list_signals(
                user,
                Some(&[SignalType::Temperament, SignalType::Sentiment]),
                SignalOrder::OldestFirst,
            )
            .await
            .unwrap();
        assert_eq!(sentiment.len(), 1);
        assert!(store
            .list_signals(Uuid::new_v4(), None, SignalOrder::OldestFirst)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_reads_as_defaults() {
        let store = setup_store().await;
        let user = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO signals (id, user_id, signal_type, value, confidence, extracted_at)
             VALUES (?, ?, 'temperament', '{\"score\": \"loud\"}', 0.7, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user.to_string())
        .bind(format_datetime(&Utc::now()))
        .execute(store.pool())
        .await
        .unwrap();

        let signals = store
            .list_signals(user, None, SignalOrder::OldestFirst)
            .await
            .unwrap();
        assert_eq!(
            signals[0].value,
            SignalValue::Temperament(TemperamentSignal::default())
        );
    }
}
