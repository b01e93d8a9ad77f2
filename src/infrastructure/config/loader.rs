use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::{DimensionConfig, FieldKey};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid min_connections: {min} exceeds max_connections ({max})")]
    InvalidMinConnections { min: u32, max: u32 },

    #[error("Invalid decay_lambda: {0}. Must be positive")]
    InvalidDecayLambda(f64),

    #[error("Invalid {0}: must be at least 1")]
    ZeroLimit(&'static str),

    #[error("Invalid default_signal_confidence: {0}. Must be within [0, 1]")]
    InvalidConfidence(f64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid dimension '{name}': {reason}")]
    InvalidDimension { name: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

const PROJECT_DIR: &str = ".traitscope";
const ENV_PREFIX: &str = "TRAITSCOPE_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .traitscope/config.yaml
    /// 3. .traitscope/local.yaml (optional overrides)
    /// 4. Environment variables (TRAITSCOPE_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same hierarchy as [`ConfigLoader::load`], rooted at `dir` instead of the
    /// working directory.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let project = dir.as_ref().join(PROJECT_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(project.join("config.yaml")))
            .merge(Yaml::file(project.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file; environment variables still
    /// take precedence.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }
        if config.database.min_connections > config.database.max_connections {
            return Err(ConfigError::InvalidMinConnections {
                min: config.database.min_connections,
                max: config.database.max_connections,
            });
        }
        if config.database.acquire_timeout_secs == 0 {
            return Err(ConfigError::ZeroLimit("database.acquire_timeout_secs"));
        }

        let lambda = config.scoring.decay_lambda;
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(ConfigError::InvalidDecayLambda(lambda));
        }
        if config.scoring.max_components == 0 {
            return Err(ConfigError::ZeroLimit("scoring.max_components"));
        }

        if config.evolution.timeline_limit == 0 {
            return Err(ConfigError::ZeroLimit("evolution.timeline_limit"));
        }
        if config.evolution.recent_window_days <= 0
            || config.evolution.historical_window_days <= 0
        {
            return Err(ConfigError::ValidationFailed(
                "evolution windows must be at least one day".to_string(),
            ));
        }
        if config.evolution.snapshot_interval_days < 0 {
            return Err(ConfigError::ValidationFailed(
                "evolution.snapshot_interval_days cannot be negative".to_string(),
            ));
        }

        let pipeline = &config.pipeline;
        if pipeline.batch_chunk_size == 0 {
            return Err(ConfigError::ZeroLimit("pipeline.batch_chunk_size"));
        }
        if pipeline.max_concurrent_extractions == 0 {
            return Err(ConfigError::ZeroLimit("pipeline.max_concurrent_extractions"));
        }
        if pipeline.max_concurrent_users == 0 {
            return Err(ConfigError::ZeroLimit("pipeline.max_concurrent_users"));
        }
        if !(0.0..=1.0).contains(&pipeline.default_signal_confidence) {
            return Err(ConfigError::InvalidConfidence(
                pipeline.default_signal_confidence,
            ));
        }

        if config.extraction.initial_backoff_ms >= config.extraction.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.extraction.initial_backoff_ms,
                config.extraction.max_backoff_ms,
            ));
        }

        let mut seen = HashSet::new();
        for dimension in &config.scoring.dimensions {
            Self::validate_dimension(dimension)?;
            if !seen.insert(dimension.name.as_str()) {
                return Err(ConfigError::InvalidDimension {
                    name: dimension.name.clone(),
                    reason: "defined more than once".to_string(),
                });
            }
        }

        Ok(())
    }

    fn validate_dimension(dimension: &DimensionConfig) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidDimension {
            name: dimension.name.clone(),
            reason,
        };

        if dimension.name.trim().is_empty() {
            return Err(invalid("name cannot be empty".to_string()));
        }
        if dimension.min_score > dimension.max_score {
            return Err(invalid(format!(
                "min_score {} exceeds max_score {}",
                dimension.min_score, dimension.max_score
            )));
        }
        if !(dimension.min_score..=dimension.max_score).contains(&dimension.default_score) {
            return Err(invalid(format!(
                "default_score {} outside [{}, {}]",
                dimension.default_score, dimension.min_score, dimension.max_score
            )));
        }
        for (key, weight) in &dimension.signal_weights {
            if FieldKey::parse(key).is_none() {
                return Err(invalid(format!("malformed signal weight key '{key}'")));
            }
            if !weight.is_finite() || *weight <= 0.0 {
                return Err(invalid(format!("weight for '{key}' must be positive")));
            }
        }
        Ok(())
    }
}
