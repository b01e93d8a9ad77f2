//! In-memory store implementing every store port.
//!
//! All state sits behind one lock so multi-table operations
//! (`record_extraction`, `commit_user_state`) are atomic the same way the
//! SQLite transactions are.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Conversation, Profile, Score, Signal, SignalType, Snapshot};
use crate::domain::ports::{
    ConversationRepository, ProfileRepository, ScoreRepository, SignalOrder, SignalRepository,
    SnapshotRepository, UnprocessedFilter, UserStateRepository, UserStateUpdate,
};

#[derive(Default)]
struct State {
    profiles: HashMap<Uuid, Profile>,
    signals: Vec<Signal>,
    scores: Vec<Score>,
    snapshots: Vec<Snapshot>,
    conversations: HashMap<Uuid, Conversation>,
}

impl State {
    fn ensure_profile(&mut self, user_id: Uuid) -> &mut Profile {
        self.profiles
            .entry(user_id)
            .or_insert_with(|| Profile::new(user_id, Utc::now()))
    }
}

/// Volatile store used by tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignalRepository for MemoryStore {
    async fn list_signals(
        &self,
        user_id: Uuid,
        types: Option<&[SignalType]>,
        order: SignalOrder,
    ) -> DomainResult<Vec<Signal>> {
        let state = self.state.read().await;
        let mut signals: Vec<Signal> = state
            .signals
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| types.map_or(true, |t| t.contains(&s.signal_type())))
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal timestamps.
        signals.sort_by_key(|s| s.extracted_at);
        if order == SignalOrder::NewestFirst {
            signals.reverse();
        }
        Ok(signals)
    }

    async fn append_signal(&self, signal: &Signal) -> DomainResult<()> {
        self.state.write().await.signals.push(signal.clone());
        Ok(())
    }

    async fn append_signals(&self, signals: &[Signal]) -> DomainResult<()> {
        self.state
            .write()
            .await
            .signals
            .extend(signals.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> DomainResult<Option<Profile>> {
        Ok(self.state.read().await.profiles.get(&user_id).cloned())
    }

    async fn get_or_create_profile(&self, user_id: Uuid) -> DomainResult<Profile> {
        let mut state = self.state.write().await;
        Ok(state.ensure_profile(user_id).clone())
    }

    async fn save_profile(&self, profile: &Profile) -> DomainResult<()> {
        self.state
            .write()
            .await
            .profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn list_user_ids(&self) -> DomainResult<Vec<Uuid>> {
        let state = self.state.read().await;
        let mut ids: Vec<Uuid> = state.profiles.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ScoreRepository for MemoryStore {
    async fn list_scores(
        &self,
        user_id: Uuid,
        dimension: Option<&str>,
    ) -> DomainResult<Vec<Score>> {
        let state = self.state.read().await;
        let mut scores: Vec<Score> = state
            .scores
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| dimension.map_or(true, |d| s.dimension == d))
            .cloned()
            .collect();
        scores.reverse();
        scores.sort_by(|a, b| b.scored_at.cmp(&a.scored_at));
        Ok(scores)
    }

    async fn append_score(&self, score: &Score) -> DomainResult<()> {
        self.state.write().await.scores.push(score.clone());
        Ok(())
    }

    async fn append_scores(&self, scores: &[Score]) -> DomainResult<()> {
        self.state.write().await.scores.extend(scores.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl SnapshotRepository for MemoryStore {
    async fn list_snapshots(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> DomainResult<Vec<Snapshot>> {
        let state = self.state.read().await;
        let mut snapshots: Vec<Snapshot> = state
            .snapshots
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        snapshots.reverse();
        snapshots.sort_by(|a, b| b.snapshot_at.cmp(&a.snapshot_at));
        if let Some(limit) = limit {
            snapshots.truncate(limit);
        }
        Ok(snapshots)
    }

    async fn append_snapshot(&self, snapshot: &Snapshot) -> DomainResult<()> {
        self.state.write().await.snapshots.push(snapshot.clone());
        Ok(())
    }
}

#[async_trait]
impl ConversationRepository for MemoryStore {
    async fn insert_conversations(&self, conversations: &[Conversation]) -> DomainResult<usize> {
        let mut state = self.state.write().await;
        let mut inserted = 0;
        for conversation in conversations {
            if state.conversations.contains_key(&conversation.conversation_id) {
                continue;
            }
            let profile = state.ensure_profile(conversation.user_id);
            if profile.primary_language.is_none() {
                profile.primary_language.clone_from(&conversation.language);
            }
            state
                .conversations
                .insert(conversation.conversation_id, conversation.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn get_conversation(&self, conversation_id: Uuid) -> DomainResult<Option<Conversation>> {
        Ok(self
            .state
            .read()
            .await
            .conversations
            .get(&conversation_id)
            .cloned())
    }

    async fn list_unprocessed(&self, filter: UnprocessedFilter) -> DomainResult<Vec<Conversation>> {
        let state = self.state.read().await;
        let mut pending: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| !c.processed)
            .filter(|c| filter.user_id.map_or(true, |u| c.user_id == u))
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.conversation_id.cmp(&b.conversation_id))
        });
        if let Some(limit) = filter.limit {
            pending.truncate(limit);
        }
        Ok(pending)
    }

    async fn record_extraction(
        &self,
        conversation_id: Uuid,
        signals: &[Signal],
    ) -> DomainResult<bool> {
        let mut state = self.state.write().await;
        match state.conversations.get_mut(&conversation_id) {
            Some(conversation) if !conversation.processed => conversation.processed = true,
            _ => return Ok(false),
        }
        state.signals.extend(signals.iter().cloned());
        Ok(true)
    }
}

#[async_trait]
impl UserStateRepository for MemoryStore {
    async fn commit_user_state(&self, update: &UserStateUpdate) -> DomainResult<()> {
        let mut state = self.state.write().await;
        state
            .profiles
            .insert(update.profile.user_id, update.profile.clone());
        state.scores.extend(update.scores.iter().cloned());
        if let Some(snapshot) = &update.snapshot {
            state.snapshots.push(snapshot.clone());
        }
        Ok(())
    }
}
