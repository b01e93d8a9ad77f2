use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::score::DimensionConfig;

/// Main configuration structure for traitscope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Score calculation configuration
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Conflict resolution, arc detection and snapshot configuration
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// Batch pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Retry policy for the signal extraction collaborator
    #[serde(default)]
    pub extraction: ExtractionRetryConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connections kept open while idle
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a free pooled connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Seconds a write waits on a locked database before failing
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_database_path() -> String {
    ".traitscope/traitscope.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_min_connections() -> u32 {
    1
}

const fn default_acquire_timeout_secs() -> u64 {
    5
}

const fn default_busy_timeout_secs() -> u64 {
    30
}

impl DatabaseConfig {
    /// `SQLite` connection URL for the configured path.
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for file output
    #[serde(default)]
    pub rotation: RotationPolicy,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
            retention_days: default_retention_days(),
        }
    }
}

/// Score calculation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoringConfig {
    /// Exponential decay rate per day; 0.03 gives a ~23 day half-life
    #[serde(default = "default_decay_lambda")]
    pub decay_lambda: f64,

    /// Maximum number of component records kept per score
    #[serde(default = "default_max_components")]
    pub max_components: usize,

    /// Scoring dimensions
    #[serde(default = "DimensionConfig::builtins")]
    pub dimensions: Vec<DimensionConfig>,
}

const fn default_decay_lambda() -> f64 {
    0.03
}

const fn default_max_components() -> usize {
    20
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            decay_lambda: default_decay_lambda(),
            max_components: default_max_components(),
            dimensions: DimensionConfig::builtins(),
        }
    }
}

/// Evolution tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EvolutionConfig {
    /// Std-dev below which recent signals count as consistent
    #[serde(default = "default_consistency_threshold")]
    pub consistency_threshold: f64,

    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i64,

    #[serde(default = "default_historical_window_days")]
    pub historical_window_days: i64,

    /// Minimum age of the latest snapshot before a new one is taken
    #[serde(default = "default_snapshot_interval_days")]
    pub snapshot_interval_days: i64,

    /// Maximum number of snapshots returned by a timeline
    #[serde(default = "default_timeline_limit")]
    pub timeline_limit: usize,

    /// Minimum total signals before arc detection is attempted
    #[serde(default = "default_min_arc_signals")]
    pub min_arc_signals: usize,
}

const fn default_consistency_threshold() -> f64 {
    1.5
}

const fn default_recent_window_days() -> i64 {
    30
}

const fn default_historical_window_days() -> i64 {
    90
}

const fn default_snapshot_interval_days() -> i64 {
    7
}

const fn default_timeline_limit() -> usize {
    52
}

const fn default_min_arc_signals() -> usize {
    3
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            consistency_threshold: default_consistency_threshold(),
            recent_window_days: default_recent_window_days(),
            historical_window_days: default_historical_window_days(),
            snapshot_interval_days: default_snapshot_interval_days(),
            timeline_limit: default_timeline_limit(),
            min_arc_signals: default_min_arc_signals(),
        }
    }
}

/// Batch pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// JSONL dataset ingested when no path is given
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Conversations written per ingest batch
    #[serde(default = "default_batch_chunk_size")]
    pub batch_chunk_size: usize,

    /// Concurrent extraction calls (the extractor is externally rate limited)
    #[serde(default = "default_max_concurrent_extractions")]
    pub max_concurrent_extractions: usize,

    /// Users recomputed in parallel
    #[serde(default = "default_max_concurrent_users")]
    pub max_concurrent_users: usize,

    /// Confidence assigned to freshly extracted signals
    #[serde(default = "default_signal_confidence")]
    pub default_signal_confidence: f64,
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("conversations.jsonl")
}

const fn default_batch_chunk_size() -> usize {
    1000
}

const fn default_max_concurrent_extractions() -> usize {
    2
}

const fn default_max_concurrent_users() -> usize {
    4
}

const fn default_signal_confidence() -> f64 {
    0.7
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            batch_chunk_size: default_batch_chunk_size(),
            max_concurrent_extractions: default_max_concurrent_extractions(),
            max_concurrent_users: default_max_concurrent_users(),
            default_signal_confidence: default_signal_confidence(),
        }
    }
}

/// Retry policy configuration for extraction calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExtractionRetryConfig {
    /// Maximum number of attempts per conversation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    2_000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for ExtractionRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
