//! Engine services: statistics, trait resolution, aggregation, scoring,
//! arc detection, snapshots and batch orchestration.

pub mod arc_detector;
pub mod batch_pipeline;
pub mod conflict_resolver;
pub mod dimensions;
pub mod profile_aggregator;
pub mod profile_engine;
pub mod reasoning;
pub mod score_calculator;
pub mod snapshot_manager;
pub mod temporal;

pub use arc_detector::{ArcAnalyzer, ArcDetector};
pub use batch_pipeline::{
    BatchPipeline, CancellationHandle, PipelineEvent, PipelineProgress, PipelineStage,
    PipelineStatus,
};
pub use conflict_resolver::{ConflictResolver, ResolvedTrait};
pub use dimensions::DimensionCatalog;
pub use profile_aggregator::{build_profile, ProfileAggregator};
pub use profile_engine::{ProfileEngine, RecomputeOutcome};
pub use score_calculator::{ScoreCalculator, ScoreEngine};
pub use snapshot_manager::SnapshotManager;
