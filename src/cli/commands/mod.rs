//! CLI command implementations.

pub mod evolution;
pub mod pipeline;
pub mod profile;
pub mod score;

use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::adapters::sqlite::{initialize_database, SqliteStore};
use crate::domain::models::{stable_uuid, Config};

/// Loaded configuration plus the opened store, shared by every command.
pub struct CommandContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
}

impl CommandContext {
    /// Open (creating and migrating if needed) the configured database.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = initialize_database(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;
        Ok(Self {
            config,
            store: Arc::new(SqliteStore::new(pool)),
        })
    }
}

/// User ids on the command line are either UUIDs or the dataset's own ids.
pub fn parse_user_id(raw: &str) -> Uuid {
    stable_uuid(raw.trim())
}
