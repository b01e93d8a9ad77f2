//! Traitscope - behavioral signal aggregation and fit scoring
//!
//! Traitscope turns per-conversation behavioral signals (temperament,
//! communication style, sentiment, life stage, topics, cooperation) into
//! evolving user profiles, explainable 0-100 fit scores, behavioral arc
//! labels and periodic profile snapshots.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): temporal weighting, conflict resolution,
//!   aggregation, scoring, arc detection, snapshots and the batch pipeline
//! - **Adapters** (`adapters`): SQLite and in-memory stores, signal extractors
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use traitscope::adapters::memory::MemoryStore;
//! use traitscope::services::ProfileEngine;
//!
//! # async fn demo(user_id: uuid::Uuid) -> traitscope::DomainResult<()> {
//! let store = Arc::new(MemoryStore::new());
//! let engine = ProfileEngine::new(store);
//! let outcome = engine.recompute_user(user_id).await?;
//! println!("{} scores, arc {}", outcome.scores.len(), outcome.arc.arc);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    ArcReport, BehavioralArc, Config, Conversation, DimensionConfig, FieldKey, Profile,
    RawSignalSet, Score, Signal, SignalSet, SignalType, SignalValue, Snapshot,
};
pub use domain::ports::{
    BehaviorStore, ConversationRepository, ProfileRepository, ScoreRepository, SignalExtractor,
    SignalRepository, SnapshotRepository, UserStateRepository,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ArcDetector, BatchPipeline, ConflictResolver, ProfileAggregator, ProfileEngine,
    ScoreCalculator, SnapshotManager,
};
