//! Score history repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Score;

#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// List a user's scores newest first, optionally for one dimension.
    async fn list_scores(&self, user_id: Uuid, dimension: Option<&str>)
        -> DomainResult<Vec<Score>>;

    /// Append one score row.
    async fn append_score(&self, score: &Score) -> DomainResult<()>;

    /// Append several score rows in a single transaction.
    async fn append_scores(&self, scores: &[Score]) -> DomainResult<()>;
}
