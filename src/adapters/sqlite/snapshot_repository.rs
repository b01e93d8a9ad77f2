//! SQLite implementation of the SnapshotRepository.

use async_trait::async_trait;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::{format_datetime, limit_value, parse_datetime, parse_json, parse_uuid, SqliteStore};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BehavioralArc, Snapshot};
use crate::domain::ports::SnapshotRepository;

pub(super) async fn insert_snapshot(
    conn: &mut SqliteConnection,
    snapshot: &Snapshot,
) -> DomainResult<()> {
    let data_json = serde_json::to_string(&snapshot.data)?;

    sqlx::query(
        "INSERT INTO snapshots (id, user_id, data, arc_label, snapshot_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(snapshot.id.to_string())
    .bind(snapshot.user_id.to_string())
    .bind(&data_json)
    .bind(snapshot.arc_label.map(|a| a.as_str()))
    .bind(format_datetime(&snapshot.snapshot_at))
    .execute(conn)
    .await?;

    Ok(())
}

#[async_trait]
impl SnapshotRepository for SqliteStore {
    async fn list_snapshots(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> DomainResult<Vec<Snapshot>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            "SELECT id, user_id, data, arc_label, snapshot_at FROM snapshots
             WHERE user_id = ? ORDER BY snapshot_at DESC, rowid DESC LIMIT ?",
        )
        .bind(user_id.to_string())
        .bind(limit_value(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn append_snapshot(&self, snapshot: &Snapshot) -> DomainResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_snapshot(&mut conn, snapshot).await
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: String,
    user_id: String,
    data: String,
    arc_label: Option<String>,
    snapshot_at: String,
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = DomainError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let arc_label = row
            .arc_label
            .map(|s| {
                BehavioralArc::from_str(&s)
                    .ok_or_else(|| DomainError::SerializationError(format!("Invalid arc: {s}")))
            })
            .transpose()?;

        Ok(Snapshot {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            data: parse_json(&row.data)?,
            arc_label,
            snapshot_at: parse_datetime(&row.snapshot_at)?,
        })
    }
}
