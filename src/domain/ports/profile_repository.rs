//! Profile repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Profile;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Get a profile, `None` when the user has none yet.
    async fn get_profile(&self, user_id: Uuid) -> DomainResult<Option<Profile>>;

    /// Get a profile, creating and persisting a "no data" one when absent.
    async fn get_or_create_profile(&self, user_id: Uuid) -> DomainResult<Profile>;

    /// Insert or replace a profile.
    async fn save_profile(&self, profile: &Profile) -> DomainResult<()>;

    /// Every user that has a profile.
    async fn list_user_ids(&self) -> DomainResult<Vec<Uuid>>;
}
