//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use traitscope::adapters::sqlite::{initialize_database, SqliteStore};
use traitscope::domain::models::DatabaseConfig;

/// File-backed store in `dir`, migrated and ready.
pub async fn sqlite_store(dir: &Path) -> Arc<SqliteStore> {
    let config = DatabaseConfig {
        path: dir.join("traitscope.db").to_string_lossy().into_owned(),
        max_connections: 4,
        ..DatabaseConfig::default()
    };
    let pool = initialize_database(&config)
        .await
        .expect("Failed to initialize test database");
    Arc::new(SqliteStore::new(pool))
}

/// Write `lines` as a JSONL file named `name` in `dir`.
pub fn write_jsonl(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create fixture");
    for line in lines {
        writeln!(file, "{line}").expect("Failed to write fixture");
    }
    path
}

/// Two users, three conversations, one undecodable line.
pub const DATASET: &[&str] = &[
    r#"{"conversation_id":"c1","user_id":"alice","model":"gpt-4","language":"English","role":"user","content":"Can you review my SQL schema?","message_index":0,"conversation_turn":1}"#,
    r#"{"conversation_id":"c1","user_id":"alice","model":"gpt-4","role":"assistant","content":"Sure, paste it here.","message_index":1,"conversation_turn":2}"#,
    r#"{"conversation_id":"c2","user_id":"alice","role":"user","content":"Thanks, that index fixed it.","message_index":0,"conversation_turn":1}"#,
    r#"{"conversation_id":"c3","user_id":"bob","language":"German","role":"user","content":"Why is this STILL broken","message_index":0,"conversation_turn":1}"#,
    "{ truncated",
];

/// Recorded extractor output for the dataset above.
pub const REPLAY: &[&str] = &[
    r#"{"conversation_id":"c1","signals":{"temperament":{"score":8,"label":"calm"},"communication_style":{"formality":0.6,"verbosity":0.5,"technicality":0.9,"structured":0.8},"sentiment":{"overall":0.6},"life_stage":{"indicators":["work"],"confidence":0.8,"domain_expertise":["databases"]},"topics":["sql","schema design"],"cooperation":{"follows_instructions":0.9,"provides_context":0.8,"politeness":0.8}}}"#,
    r#"{"conversation_id":"c2","signals":{"temperament":{"score":6,"label":"content"},"sentiment":{"overall":0.6},"topics":["sql"],"cooperation":{"follows_instructions":0.9,"provides_context":0.7,"politeness":0.8}}}"#,
    r#"{"conversation_id":"c3","signals":"```json\n{\"temperament\":{\"score\":2,\"label\":\"frustrated\"},\"sentiment\":{\"overall\":-0.8,\"frustration_detected\":true},\"cooperation\":{\"follows_instructions\":0.2,\"politeness\":0.1}}\n```"}"#,
];
