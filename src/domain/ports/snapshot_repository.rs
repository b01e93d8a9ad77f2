//! Snapshot repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Snapshot;

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// List a user's snapshots newest first, at most `limit` when given.
    async fn list_snapshots(&self, user_id: Uuid, limit: Option<usize>)
        -> DomainResult<Vec<Snapshot>>;

    async fn append_snapshot(&self, snapshot: &Snapshot) -> DomainResult<()>;
}
