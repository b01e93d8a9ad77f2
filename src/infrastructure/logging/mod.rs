//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty console output
//! - Rolling JSON file output with retention cleanup

pub mod logger;
pub mod retention;

pub use logger::{LoggerImpl, LOG_FILE_NAME};
pub use retention::prune_expired_logs;
