//! Immutable point-in-time captures of a profile and its latest scores.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::arc::BehavioralArc;
use super::profile::{
    CommunicationStyleTrait, InteractionStats, LifeStageTrait, Profile, SentimentTrend,
    TemperamentTrait, TopicInterests,
};
use super::score::Score;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotScore {
    pub score: f64,
    pub reasoning: String,
}

/// Frozen copy of the profile's traits plus the latest score per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub temperament: TemperamentTrait,
    pub communication_style: CommunicationStyleTrait,
    pub sentiment_trend: SentimentTrend,
    pub life_stage: LifeStageTrait,
    pub topic_interests: TopicInterests,
    pub interaction_stats: InteractionStats,
    pub primary_language: Option<String>,
    pub current_arc: Option<BehavioralArc>,
    pub profile_version: u64,
    pub scores: BTreeMap<String, SnapshotScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub data: SnapshotData,
    pub arc_label: Option<BehavioralArc>,
    pub snapshot_at: DateTime<Utc>,
}

impl Snapshot {
    /// Capture `profile` together with the newest score of each dimension.
    ///
    /// `scores` must be ordered newest first; only the first entry seen per
    /// dimension is kept.
    pub fn capture(profile: &Profile, scores: &[Score], now: DateTime<Utc>) -> Self {
        let mut latest = BTreeMap::new();
        for score in scores {
            latest
                .entry(score.dimension.clone())
                .or_insert_with(|| SnapshotScore {
                    score: score.score,
                    reasoning: score.reasoning.clone(),
                });
        }

        Self {
            id: Uuid::new_v4(),
            user_id: profile.user_id,
            data: SnapshotData {
                temperament: profile.temperament.clone(),
                communication_style: profile.communication_style.clone(),
                sentiment_trend: profile.sentiment_trend.clone(),
                life_stage: profile.life_stage.clone(),
                topic_interests: profile.topic_interests.clone(),
                interaction_stats: profile.interaction_stats.clone(),
                primary_language: profile.primary_language.clone(),
                current_arc: profile.current_arc,
                profile_version: profile.profile_version,
                scores: latest,
            },
            arc_label: profile.current_arc,
            snapshot_at: now,
        }
    }
}
