//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - Programmatic defaults
//! - Project YAML files under `.traitscope/`
//! - `TRAITSCOPE_*` environment overrides
//! - Validation into a typed [`ConfigError`]

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
