//! Signal repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Signal, SignalType};

/// Ordering of listed signals by `extracted_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignalOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

/// Repository interface for the append-only signal log.
#[async_trait]
pub trait SignalRepository: Send + Sync {
    /// List a user's signals, optionally restricted to some types.
    async fn list_signals(
        &self,
        user_id: Uuid,
        types: Option<&[SignalType]>,
        order: SignalOrder,
    ) -> DomainResult<Vec<Signal>>;

    /// Append one signal.
    async fn append_signal(&self, signal: &Signal) -> DomainResult<()>;

    /// Append several signals in a single transaction.
    async fn append_signals(&self, signals: &[Signal]) -> DomainResult<()>;
}
