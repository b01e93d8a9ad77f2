//! Extractor that replays recorded extraction output.
//!
//! Each line of a replay file is `{"conversation_id": ..., "signals": ...}`
//! where `signals` is either a signal-set object or the raw text an
//! extraction model returned (optionally inside a markdown code fence).

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{stable_uuid, Conversation, RawSignalSet};
use crate::domain::ports::SignalExtractor;

#[derive(Debug, Deserialize)]
struct ReplayEntry {
    conversation_id: serde_json::Value,
    signals: serde_json::Value,
}

impl ReplayEntry {
    fn conversation_key(&self) -> String {
        match &self.conversation_id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn into_raw(self) -> DomainResult<RawSignalSet> {
        match self.signals {
            serde_json::Value::String(text) => RawSignalSet::from_json_text(&text),
            value => Ok(serde_json::from_value(value)?),
        }
    }
}

/// Serves recorded signal sets keyed by conversation. Conversations without
/// a recording yield an empty raw set, which validates to all defaults.
#[derive(Debug, Default, Clone)]
pub struct ReplayExtractor {
    recorded: HashMap<Uuid, RawSignalSet>,
}

impl ReplayExtractor {
    pub fn new(recorded: HashMap<Uuid, RawSignalSet>) -> Self {
        Self { recorded }
    }

    /// Load a replay file. Undecodable lines are skipped with a warning.
    pub async fn from_path(path: &Path) -> DomainResult<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(DomainError::DatasetNotFound(path.to_path_buf()));
        }
        let file = tokio::fs::File::open(path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut recorded = HashMap::new();
        let mut line_number = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<ReplayEntry>(&line)
                .map_err(DomainError::from)
                .and_then(|entry| {
                    let id = stable_uuid(&entry.conversation_key());
                    entry.into_raw().map(|raw| (id, raw))
                });
            match parsed {
                Ok((id, raw)) => {
                    recorded.insert(id, raw);
                }
                Err(err) => warn!(line = line_number, error = %err, "skipping replay line"),
            }
        }

        debug!(recordings = recorded.len(), "replay file loaded");
        Ok(Self { recorded })
    }

    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }
}

#[async_trait]
impl SignalExtractor for ReplayExtractor {
    async fn extract(&self, conversation: &Conversation) -> DomainResult<RawSignalSet> {
        match self.recorded.get(&conversation.conversation_id) {
            Some(raw) => Ok(raw.clone()),
            None => {
                debug!(conversation_id = %conversation.conversation_id, "no recording, using empty signal set");
                Ok(RawSignalSet::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io::Write;

    fn conversation(id: Uuid) -> Conversation {
        Conversation {
            conversation_id: id,
            user_id: Uuid::new_v4(),
            model: None,
            language: None,
            total_turns: 0,
            messages: Vec::new(),
            processed: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_replay_file_object_and_text_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"conversation_id": "c1", "signals": {{"topics": ["chess"], "temperament": {{"score": 8}}}}}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"conversation_id": "c2", "signals": "```json\n{{\"topics\": [\"go\"]}}\n```"}}"#
        )
        .unwrap();
        writeln!(file, "garbage").unwrap();

        let extractor = ReplayExtractor::from_path(file.path()).await.unwrap();
        assert_eq!(extractor.len(), 2);

        let c1 = extractor
            .extract(&conversation(stable_uuid("c1")))
            .await
            .unwrap();
        assert_eq!(c1.topics, Some(vec!["chess".to_string()]));
        assert_eq!(c1.temperament.and_then(|t| t.score), Some(8.0));

        let c2 = extractor
            .extract(&conversation(stable_uuid("c2")))
            .await
            .unwrap();
        assert_eq!(c2.topics, Some(vec!["go".to_string()]));

        let unknown = extractor
            .extract(&conversation(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(unknown.topics.is_none());
    }

    #[tokio::test]
    async fn test_missing_replay_file() {
        let err = ReplayExtractor::from_path(Path::new("/nonexistent/replay.jsonl"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DatasetNotFound(_)));
    }
}
