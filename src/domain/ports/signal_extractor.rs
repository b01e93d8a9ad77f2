//! Signal extraction collaborator port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Conversation, RawSignalSet};

/// Turns one conversation into loosely-typed behavioral observations.
///
/// Implementations own their transport, rate limiting and retries. The
/// engine validates and clamps whatever comes back.
#[async_trait]
pub trait SignalExtractor: Send + Sync {
    async fn extract(&self, conversation: &Conversation) -> DomainResult<RawSignalSet>;
}
