//! Conversation repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Conversation, Signal};

/// Filter criteria for selecting conversations awaiting extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnprocessedFilter {
    pub user_id: Option<Uuid>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Insert conversations in one transaction, skipping ids that already
    /// exist. Every referenced user gets a profile; a profile without a
    /// primary language takes the conversation's. Returns the number of
    /// conversations actually inserted.
    async fn insert_conversations(&self, conversations: &[Conversation]) -> DomainResult<usize>;

    /// Get a conversation by ID.
    async fn get_conversation(&self, conversation_id: Uuid) -> DomainResult<Option<Conversation>>;

    /// Conversations not yet marked processed, oldest first.
    async fn list_unprocessed(&self, filter: UnprocessedFilter) -> DomainResult<Vec<Conversation>>;

    /// Store extracted signals and mark the conversation processed, atomically.
    ///
    /// Returns `false`, storing nothing, when the conversation is unknown or
    /// was already processed by another run.
    async fn record_extraction(&self, conversation_id: Uuid, signals: &[Signal])
        -> DomainResult<bool>;
}
