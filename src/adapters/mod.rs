//! Infrastructure adapters: storage backends and signal extractors.

pub mod extraction;
pub mod memory;
pub mod sqlite;
