//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that infrastructure adapters implement:
//! - Signal, profile, score and snapshot stores
//! - ConversationRepository: ingested conversations and extraction bookkeeping
//! - UserStateRepository: all-or-nothing per-user commits
//! - SignalExtractor: the external signal-producing collaborator

pub mod conversation_repository;
pub mod profile_repository;
pub mod score_repository;
pub mod signal_extractor;
pub mod signal_repository;
pub mod snapshot_repository;
pub mod user_state_repository;

pub use conversation_repository::{ConversationRepository, UnprocessedFilter};
pub use profile_repository::ProfileRepository;
pub use score_repository::ScoreRepository;
pub use signal_extractor::SignalExtractor;
pub use signal_repository::{SignalOrder, SignalRepository};
pub use snapshot_repository::SnapshotRepository;
pub use user_state_repository::{UserStateRepository, UserStateUpdate};

/// Every store port at once; implemented by the SQLite and in-memory adapters.
pub trait BehaviorStore:
    SignalRepository
    + ProfileRepository
    + ScoreRepository
    + SnapshotRepository
    + ConversationRepository
    + UserStateRepository
{
}

impl<T> BehaviorStore for T where
    T: SignalRepository
        + ProfileRepository
        + ScoreRepository
        + SnapshotRepository
        + ConversationRepository
        + UserStateRepository
{
}
