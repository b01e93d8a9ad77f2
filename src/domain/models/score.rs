//! Fit score domain model and dimension configuration.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::signal::{SignalType, SignalValue};

/// One contributing field of one signal to a computed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub signal_id: Uuid,
    /// `"signal_type.field"` key that produced the value
    pub key: String,
    /// Mapped value on the 0-100 scale
    pub value: f64,
    /// decay × confidence × field weight
    pub weight: f64,
    pub days_ago: f64,
}

/// Append-only score history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dimension: String,
    pub score: f64,
    pub previous_score: Option<f64>,
    pub reasoning: String,
    pub components: Vec<ScoreComponent>,
    pub scored_at: DateTime<Utc>,
}

/// Field of a signal payload addressable by a dimension weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalField {
    /// 1-10 temperament score scaled to 0-100
    Score,
    /// (10 − score) / 10 × 100
    ScoreInverted,
    /// [-1,1] sentiment mapped to 0-100
    Overall,
    /// [-1,1] sentiment inverted onto 0-100
    OverallInverted,
    FrustrationDetected,
    Formality,
    Verbosity,
    Technicality,
    Structured,
    FollowsInstructions,
    ProvidesContext,
    Politeness,
    Confidence,
    /// Distinct topic count, bounded
    Diversity,
    /// Domain expertise tag count, bounded
    DomainCount,
}

impl SignalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Score => "score",
            Self::ScoreInverted => "score_inverted",
            Self::Overall => "overall",
            Self::OverallInverted => "overall_inverted",
            Self::FrustrationDetected => "frustration_detected",
            Self::Formality => "formality",
            Self::Verbosity => "verbosity",
            Self::Technicality => "technicality",
            Self::Structured => "structured",
            Self::FollowsInstructions => "follows_instructions",
            Self::ProvidesContext => "provides_context",
            Self::Politeness => "politeness",
            Self::Confidence => "confidence",
            Self::Diversity => "diversity",
            Self::DomainCount => "domain_count",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "score" => Some(Self::Score),
            "score_inverted" => Some(Self::ScoreInverted),
            "overall" => Some(Self::Overall),
            "overall_inverted" => Some(Self::OverallInverted),
            "frustration_detected" => Some(Self::FrustrationDetected),
            "formality" => Some(Self::Formality),
            "verbosity" => Some(Self::Verbosity),
            "technicality" => Some(Self::Technicality),
            "structured" => Some(Self::Structured),
            "follows_instructions" => Some(Self::FollowsInstructions),
            "provides_context" => Some(Self::ProvidesContext),
            "politeness" => Some(Self::Politeness),
            "confidence" => Some(Self::Confidence),
            "diversity" => Some(Self::Diversity),
            "domain_count" => Some(Self::DomainCount),
            _ => None,
        }
    }
}

/// Parsed `"signal_type.field"` weight key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub signal_type: SignalType,
    pub field: SignalField,
}

impl FieldKey {
    pub fn parse(key: &str) -> Option<Self> {
        let (signal_type, field) = key.split_once('.')?;
        Some(Self {
            signal_type: SignalType::from_str(signal_type)?,
            field: SignalField::from_str(field)?,
        })
    }

    pub fn as_key(&self) -> String {
        format!("{}.{}", self.signal_type.as_str(), self.field.as_str())
    }

    /// The field's raw, unscaled reading on `value`.
    ///
    /// `None` when the payload is of another signal type or the field does
    /// not exist on that type. Booleans read as 0/1 and list fields as their
    /// (distinct) length.
    pub fn raw_value(&self, value: &SignalValue) -> Option<f64> {
        use SignalField as F;
        if value.signal_type() != self.signal_type {
            return None;
        }
        match (value, self.field) {
            (SignalValue::Temperament(t), F::Score | F::ScoreInverted) => Some(t.score),
            (SignalValue::Sentiment(s), F::Overall | F::OverallInverted) => Some(s.overall),
            (SignalValue::Sentiment(s), F::FrustrationDetected) => {
                Some(if s.frustration_detected { 1.0 } else { 0.0 })
            }
            (SignalValue::CommunicationStyle(c), F::Formality) => Some(c.formality),
            (SignalValue::CommunicationStyle(c), F::Verbosity) => Some(c.verbosity),
            (SignalValue::CommunicationStyle(c), F::Technicality) => Some(c.technicality),
            (SignalValue::CommunicationStyle(c), F::Structured) => Some(c.structured),
            (SignalValue::Cooperation(c), F::FollowsInstructions) => Some(c.follows_instructions),
            (SignalValue::Cooperation(c), F::ProvidesContext) => Some(c.provides_context),
            (SignalValue::Cooperation(c), F::Politeness) => Some(c.politeness),
            (SignalValue::LifeStage(l), F::Confidence) => Some(l.confidence),
            (SignalValue::LifeStage(l), F::DomainCount) => Some(l.domain_expertise.len() as f64),
            (SignalValue::Topics(t), F::Diversity) => {
                let distinct: BTreeSet<&str> = t.topics.iter().map(String::as_str).collect();
                Some(distinct.len() as f64)
            }
            _ => None,
        }
    }

    /// The field's reading mapped onto the 0-100 scoring scale. Non-finite
    /// readings contribute nothing.
    pub fn scaled_value(&self, value: &SignalValue) -> Option<f64> {
        let raw = self.raw_value(value).filter(|v| v.is_finite())?;
        Some(match self.field {
            SignalField::Score => raw / 10.0 * 100.0,
            SignalField::ScoreInverted => (10.0 - raw) / 10.0 * 100.0,
            SignalField::Overall => (raw + 1.0) / 2.0 * 100.0,
            SignalField::OverallInverted => (1.0 - raw) / 2.0 * 100.0,
            SignalField::Diversity => (raw * 20.0).min(100.0),
            SignalField::DomainCount => (raw * 25.0).min(100.0),
            _ => raw * 100.0,
        })
    }
}

/// Configuration of one scoring dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Human label used in reasoning text; derived from the name when absent
    #[serde(default)]
    pub label: Option<String>,
    pub signal_types: Vec<SignalType>,
    /// `"signal_type.field"` -> weight
    pub signal_weights: BTreeMap<String, f64>,
    #[serde(default = "default_score")]
    pub default_score: f64,
    #[serde(default)]
    pub min_score: f64,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
}

const fn default_score() -> f64 {
    50.0
}

const fn default_max_score() -> f64 {
    100.0
}

impl DimensionConfig {
    fn builtin(
        name: &str,
        label: &str,
        description: &str,
        signal_types: &[SignalType],
        weights: &[(&str, f64)],
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            label: Some(label.to_string()),
            signal_types: signal_types.to_vec(),
            signal_weights: weights
                .iter()
                .map(|(k, w)| ((*k).to_string(), *w))
                .collect(),
            default_score: default_score(),
            min_score: 0.0,
            max_score: default_max_score(),
        }
    }

    /// Display label, e.g. `escalation_risk` -> `Escalation Risk` when not configured.
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        self.name
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                chars.next().map_or_else(String::new, |c| {
                    c.to_uppercase().chain(chars).collect::<String>()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The five dimensions shipped by default.
    pub fn builtins() -> Vec<Self> {
        use SignalType::{CommunicationStyle, Cooperation, LifeStage, Sentiment, Temperament, Topics};
        vec![
            Self::builtin(
                "responsiveness",
                "Responsiveness",
                "How actively and deeply the user engages in conversations",
                &[CommunicationStyle, Cooperation],
                &[
                    ("communication_style.verbosity", 0.3),
                    ("cooperation.provides_context", 0.4),
                    ("cooperation.follows_instructions", 0.3),
                ],
            ),
            Self::builtin(
                "escalation_risk",
                "Escalation risk",
                "Likelihood of the user becoming frustrated or confrontational",
                &[Temperament, Sentiment],
                &[
                    ("temperament.score_inverted", 0.4),
                    ("sentiment.frustration_detected", 0.3),
                    ("sentiment.overall_inverted", 0.3),
                ],
            ),
            Self::builtin(
                "engagement_quality",
                "Engagement quality",
                "Depth and richness of user engagement",
                &[CommunicationStyle, Topics, Cooperation],
                &[
                    ("communication_style.technicality", 0.3),
                    ("communication_style.structured", 0.2),
                    ("topics.diversity", 0.2),
                    ("cooperation.provides_context", 0.3),
                ],
            ),
            Self::builtin(
                "cooperation_level",
                "Cooperation level",
                "How cooperative and pleasant the user is to interact with",
                &[Cooperation, Temperament, Sentiment],
                &[
                    ("cooperation.follows_instructions", 0.3),
                    ("cooperation.politeness", 0.3),
                    ("temperament.score", 0.2),
                    ("sentiment.overall", 0.2),
                ],
            ),
            Self::builtin(
                "expertise_level",
                "Expertise level",
                "User's technical knowledge and domain expertise",
                &[CommunicationStyle, LifeStage],
                &[
                    ("communication_style.technicality", 0.5),
                    ("communication_style.formality", 0.1),
                    ("life_stage.domain_count", 0.2),
                    ("life_stage.confidence", 0.2),
                ],
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key_parse() {
        let key = FieldKey::parse("temperament.score_inverted").unwrap();
        assert_eq!(key.signal_type, SignalType::Temperament);
        assert_eq!(key.field, SignalField::ScoreInverted);
        assert_eq!(key.as_key(), "temperament.score_inverted");

        assert!(FieldKey::parse("temperament").is_none());
        assert!(FieldKey::parse("mood.score").is_none());
        assert!(FieldKey::parse("temperament.charm").is_none());
    }

    #[test]
    fn test_field_mapping_onto_score_scale() {
        use crate::domain::models::signal::{
            LifeStageSignal, SentimentSignal, TemperamentSignal, TopicsSignal,
        };

        let temperament = SignalValue::Temperament(TemperamentSignal {
            score: 3.0,
            ..Default::default()
        });
        let scaled = |key: &str, v: &SignalValue| FieldKey::parse(key).unwrap().scaled_value(v);
        let near = |got: Option<f64>, want: f64| got.is_some_and(|g| (g - want).abs() < 1e-9);
        assert!(near(scaled("temperament.score", &temperament), 30.0));
        assert!(near(scaled("temperament.score_inverted", &temperament), 70.0));
        assert_eq!(scaled("sentiment.overall", &temperament), None);

        let sentiment = SignalValue::Sentiment(SentimentSignal {
            overall: -0.5,
            frustration_detected: true,
            ..Default::default()
        });
        assert!(near(scaled("sentiment.overall", &sentiment), 25.0));
        assert!(near(scaled("sentiment.overall_inverted", &sentiment), 75.0));
        assert_eq!(scaled("sentiment.frustration_detected", &sentiment), Some(100.0));

        let topics = SignalValue::Topics(TopicsSignal {
            topics: vec!["a".into(), "b".into(), "a".into()],
        });
        assert_eq!(scaled("topics.diversity", &topics), Some(40.0));

        let life = SignalValue::LifeStage(LifeStageSignal {
            domain_expertise: (0..6).map(|i| i.to_string()).collect(),
            confidence: 0.4,
            ..Default::default()
        });
        assert_eq!(scaled("life_stage.domain_count", &life), Some(100.0));
        assert!(near(scaled("life_stage.confidence", &life), 40.0));
        // A field that exists on no payload of that type contributes nothing.
        assert_eq!(scaled("life_stage.politeness", &life), None);
    }

    #[test]
    fn test_builtin_keys_all_parse() {
        for dim in DimensionConfig::builtins() {
            for key in dim.signal_weights.keys() {
                let parsed = FieldKey::parse(key).unwrap_or_else(|| panic!("bad key {key}"));
                assert!(dim.signal_types.contains(&parsed.signal_type));
            }
        }
    }

    #[test]
    fn test_display_label_falls_back_to_title_case() {
        let mut dim = DimensionConfig::builtins().remove(1);
        assert_eq!(dim.display_label(), "Escalation risk");
        dim.label = None;
        assert_eq!(dim.display_label(), "Escalation Risk");
    }
}
