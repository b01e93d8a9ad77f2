//! User profile domain model.
//!
//! Every trait field is always a fully populated record; the `Default`
//! implementations are the well-defined "no data" state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::arc::BehavioralArc;
use super::signal::defaults;

/// Qualitative spread of a trait's underlying signal values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    #[default]
    Low,
    Medium,
    High,
}

impl Volatility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Grade a standard deviation against `(medium, high)` thresholds.
    pub fn from_std_dev(std_dev: f64, medium_above: f64, high_above: f64) -> Self {
        if std_dev > high_above {
            Self::High
        } else if std_dev > medium_above {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for Volatility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const NO_DATA: &str = "No data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperamentTrait {
    pub score: f64,
    pub label: String,
    pub volatility: Volatility,
    pub summary: String,
}

impl Default for TemperamentTrait {
    fn default() -> Self {
        Self {
            score: defaults::TEMPERAMENT_SCORE,
            label: defaults::TEMPERAMENT_LABEL.to_string(),
            volatility: Volatility::Low,
            summary: NO_DATA.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationStyleTrait {
    pub formality: f64,
    pub verbosity: f64,
    pub technicality: f64,
    pub structured: f64,
    pub summary: String,
}

impl Default for CommunicationStyleTrait {
    fn default() -> Self {
        Self {
            formality: defaults::UNIT_MIDPOINT,
            verbosity: defaults::UNIT_MIDPOINT,
            technicality: defaults::UNIT_MIDPOINT,
            structured: defaults::UNIT_MIDPOINT,
            summary: NO_DATA.to_string(),
        }
    }
}

/// Direction of the sentiment trend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentDirection {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl SentimentDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentTrend {
    pub direction: SentimentDirection,
    pub recent_avg: f64,
    pub frustration_rate: f64,
    pub summary: String,
}

impl Default for SentimentTrend {
    fn default() -> Self {
        Self {
            direction: SentimentDirection::Stable,
            recent_avg: 0.0,
            frustration_rate: 0.0,
            summary: NO_DATA.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeStageTrait {
    pub stage: String,
    pub confidence: f64,
    pub domain_expertise: Vec<String>,
    /// Top indicator tallies rendered as `"indicator: Nx"`
    pub signals: Vec<String>,
}

impl Default for LifeStageTrait {
    fn default() -> Self {
        Self {
            stage: "unknown".to_string(),
            confidence: 0.0,
            domain_expertise: Vec::new(),
            signals: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicInterests {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionStats {
    pub total_conversations_analyzed: usize,
    pub total_signals: usize,
}

/// Consolidated per-user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub temperament: TemperamentTrait,
    pub communication_style: CommunicationStyleTrait,
    pub sentiment_trend: SentimentTrend,
    pub life_stage: LifeStageTrait,
    pub topic_interests: TopicInterests,
    pub interaction_stats: InteractionStats,
    pub primary_language: Option<String>,
    pub current_arc: Option<BehavioralArc>,
    /// Starts at 0 and increments once per successful aggregation
    pub profile_version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A fresh profile with every trait at its "no data" default.
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            temperament: TemperamentTrait::default(),
            communication_style: CommunicationStyleTrait::default(),
            sentiment_trend: SentimentTrend::default(),
            life_stage: LifeStageTrait::default(),
            topic_interests: TopicInterests::default(),
            interaction_stats: InteractionStats::default(),
            primary_language: None,
            current_arc: None,
            profile_version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_has_no_data_defaults() {
        let profile = Profile::new(Uuid::new_v4(), Utc::now());
        assert_eq!(profile.profile_version, 0);
        assert_eq!(profile.temperament.summary, "No data");
        assert_eq!(profile.life_stage.stage, "unknown");
        assert!(profile.topic_interests.primary.is_empty());
        assert!(profile.current_arc.is_none());
    }

    #[test]
    fn test_volatility_grading() {
        assert_eq!(Volatility::from_std_dev(0.5, 1.5, 2.5), Volatility::Low);
        assert_eq!(Volatility::from_std_dev(1.5, 1.5, 2.5), Volatility::Low);
        assert_eq!(Volatility::from_std_dev(2.0, 1.5, 2.5), Volatility::Medium);
        assert_eq!(Volatility::from_std_dev(3.1, 1.5, 2.5), Volatility::High);
    }

    #[test]
    fn test_trait_defaults_fill_missing_json_fields() {
        let t: TemperamentTrait = serde_json::from_str(r#"{"score": 8.0}"#).unwrap();
        assert_eq!(t.score, 8.0);
        assert_eq!(t.label, "neutral");
        assert_eq!(t.volatility, Volatility::Low);
    }
}
