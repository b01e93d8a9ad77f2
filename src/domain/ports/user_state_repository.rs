//! Atomic per-user state commit port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Profile, Score, Snapshot};

/// Everything a single recompute produces for one user.
#[derive(Debug, Clone)]
pub struct UserStateUpdate {
    pub profile: Profile,
    pub scores: Vec<Score>,
    pub snapshot: Option<Snapshot>,
}

#[async_trait]
pub trait UserStateRepository: Send + Sync {
    /// Save the profile and append the scores and snapshot all-or-nothing.
    async fn commit_user_state(&self, update: &UserStateUpdate) -> DomainResult<()>;
}
