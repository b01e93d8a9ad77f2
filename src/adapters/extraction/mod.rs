//! Signal extractor adapters.
//!
//! - `ReplayExtractor`: serves pre-extracted signal sets from a JSONL file
//! - `RetryingExtractor`: wraps any extractor with exponential backoff

pub mod replay;
pub mod retrying;

pub use replay::ReplayExtractor;
pub use retrying::{RetryPolicy, RetryingExtractor};
