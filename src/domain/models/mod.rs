//! Domain models for the traitscope engine.

pub mod arc;
pub mod config;
pub mod conversation;
pub mod profile;
pub mod score;
pub mod signal;
pub mod snapshot;

pub use arc::{ArcReport, BehavioralArc, Divergence, SubArc, SubArcs, TrendDirection};
pub use config::{
    Config, DatabaseConfig, EvolutionConfig, ExtractionRetryConfig, LogFormat, LoggingConfig,
    PipelineConfig, RotationPolicy, ScoringConfig,
};
pub use conversation::{stable_uuid, Conversation, DatasetRecord, Message};
pub use profile::{
    CommunicationStyleTrait, InteractionStats, LifeStageTrait, Profile, SentimentDirection,
    SentimentTrend, TemperamentTrait, TopicInterests, Volatility,
};
pub use score::{DimensionConfig, FieldKey, Score, ScoreComponent, SignalField};
pub use signal::{
    clamp_or, CommunicationStyleSignal, CooperationSignal, LifeStageSignal, RawSignalSet, SentimentSignal,
    Signal, SignalSet, SignalType, SignalValue, TemperamentSignal, TopicsSignal,
};
pub use snapshot::{Snapshot, SnapshotData, SnapshotScore};
