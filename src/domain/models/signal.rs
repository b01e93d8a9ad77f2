//! Behavioral signal domain model.
//!
//! A signal is one immutable, timestamped observation about a user. Each
//! signal type carries its own fixed payload; missing or malformed payload
//! fields resolve to the canonical defaults in [`defaults`] so every consumer
//! (extraction validation, aggregation, scoring) agrees on what "no data" is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Canonical default values for every signal payload field.
pub mod defaults {
    /// Neutral temperament on the 1-10 scale.
    pub const TEMPERAMENT_SCORE: f64 = 5.0;
    pub const TEMPERAMENT_LABEL: &str = "neutral";
    /// Midpoint for every [0,1] style and cooperation dimension.
    pub const UNIT_MIDPOINT: f64 = 0.5;
    pub const SENTIMENT_OVERALL: f64 = 0.0;
    pub const SENTIMENT_ARC: &str = "stable";
    /// Confidence assumed when the extractor reports life-stage data without one.
    pub const LIFE_STAGE_CONFIDENCE: f64 = 0.5;
    /// Confidence of an empty (nothing extracted) life-stage payload.
    pub const LIFE_STAGE_EMPTY_CONFIDENCE: f64 = 0.0;
    pub const TEMPERAMENT_MIN: f64 = 1.0;
    pub const TEMPERAMENT_MAX: f64 = 10.0;
}

/// The closed set of signal types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Temperament,
    CommunicationStyle,
    Sentiment,
    LifeStage,
    Topics,
    Cooperation,
}

impl SignalType {
    /// Every signal type, in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Temperament,
        Self::CommunicationStyle,
        Self::Sentiment,
        Self::LifeStage,
        Self::Topics,
        Self::Cooperation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperament => "temperament",
            Self::CommunicationStyle => "communication_style",
            Self::Sentiment => "sentiment",
            Self::LifeStage => "life_stage",
            Self::Topics => "topics",
            Self::Cooperation => "cooperation",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "temperament" => Some(Self::Temperament),
            "communication_style" => Some(Self::CommunicationStyle),
            "sentiment" => Some(Self::Sentiment),
            "life_stage" => Some(Self::LifeStage),
            "topics" => Some(Self::Topics),
            "cooperation" => Some(Self::Cooperation),
            _ => None,
        }
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temperament observation: 1 (hostile) to 10 (agreeable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperamentSignal {
    pub score: f64,
    pub label: String,
    pub evidence: String,
}

impl Default for TemperamentSignal {
    fn default() -> Self {
        Self {
            score: defaults::TEMPERAMENT_SCORE,
            label: defaults::TEMPERAMENT_LABEL.to_string(),
            evidence: String::new(),
        }
    }
}

/// Communication style observation, every dimension in [0,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationStyleSignal {
    pub formality: f64,
    pub verbosity: f64,
    pub technicality: f64,
    pub structured: f64,
}

impl Default for CommunicationStyleSignal {
    fn default() -> Self {
        Self {
            formality: defaults::UNIT_MIDPOINT,
            verbosity: defaults::UNIT_MIDPOINT,
            technicality: defaults::UNIT_MIDPOINT,
            structured: defaults::UNIT_MIDPOINT,
        }
    }
}

/// Sentiment observation; `overall` in [-1,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentSignal {
    pub overall: f64,
    pub arc: String,
    pub frustration_detected: bool,
}

impl Default for SentimentSignal {
    fn default() -> Self {
        Self {
            overall: defaults::SENTIMENT_OVERALL,
            arc: defaults::SENTIMENT_ARC.to_string(),
            frustration_detected: false,
        }
    }
}

/// Life stage observation: free-text indicator and expertise tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeStageSignal {
    pub indicators: Vec<String>,
    pub confidence: f64,
    pub domain_expertise: Vec<String>,
}

impl Default for LifeStageSignal {
    fn default() -> Self {
        Self {
            indicators: Vec::new(),
            confidence: defaults::LIFE_STAGE_EMPTY_CONFIDENCE,
            domain_expertise: Vec::new(),
        }
    }
}

/// Topic tags discussed in one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsSignal {
    pub topics: Vec<String>,
}

/// Cooperation observation, every dimension in [0,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooperationSignal {
    pub follows_instructions: f64,
    pub provides_context: f64,
    pub politeness: f64,
}

impl Default for CooperationSignal {
    fn default() -> Self {
        Self {
            follows_instructions: defaults::UNIT_MIDPOINT,
            provides_context: defaults::UNIT_MIDPOINT,
            politeness: defaults::UNIT_MIDPOINT,
        }
    }
}

/// Typed signal payload, one variant per [`SignalType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal_type", content = "value", rename_all = "snake_case")]
pub enum SignalValue {
    Temperament(TemperamentSignal),
    CommunicationStyle(CommunicationStyleSignal),
    Sentiment(SentimentSignal),
    LifeStage(LifeStageSignal),
    Topics(TopicsSignal),
    Cooperation(CooperationSignal),
}

impl SignalValue {
    pub fn signal_type(&self) -> SignalType {
        match self {
            Self::Temperament(_) => SignalType::Temperament,
            Self::CommunicationStyle(_) => SignalType::CommunicationStyle,
            Self::Sentiment(_) => SignalType::Sentiment,
            Self::LifeStage(_) => SignalType::LifeStage,
            Self::Topics(_) => SignalType::Topics,
            Self::Cooperation(_) => SignalType::Cooperation,
        }
    }

    /// The canonical "no data" payload for a signal type.
    pub fn default_for(signal_type: SignalType) -> Self {
        match signal_type {
            SignalType::Temperament => Self::Temperament(TemperamentSignal::default()),
            SignalType::CommunicationStyle => {
                Self::CommunicationStyle(CommunicationStyleSignal::default())
            }
            SignalType::Sentiment => Self::Sentiment(SentimentSignal::default()),
            SignalType::LifeStage => Self::LifeStage(LifeStageSignal::default()),
            SignalType::Topics => Self::Topics(TopicsSignal::default()),
            SignalType::Cooperation => Self::Cooperation(CooperationSignal::default()),
        }
    }

    /// Decode a stored payload, falling back to the type's defaults when the
    /// stored JSON does not match the expected shape.
    pub fn from_stored(signal_type: SignalType, payload: serde_json::Value) -> Self {
        let decoded = match signal_type {
            SignalType::Temperament => serde_json::from_value(payload).map(Self::Temperament),
            SignalType::CommunicationStyle => {
                serde_json::from_value(payload).map(Self::CommunicationStyle)
            }
            SignalType::Sentiment => serde_json::from_value(payload).map(Self::Sentiment),
            SignalType::LifeStage => serde_json::from_value(payload).map(Self::LifeStage),
            SignalType::Topics => serde_json::from_value(payload).map(Self::Topics),
            SignalType::Cooperation => serde_json::from_value(payload).map(Self::Cooperation),
        };
        decoded.unwrap_or_else(|err| {
            tracing::debug!(signal_type = %signal_type, error = %err, "malformed signal payload, using defaults");
            Self::default_for(signal_type)
        })
    }

    /// Replace non-finite numeric readings with the type's defaults.
    pub fn sanitized(self) -> Self {
        use defaults::{LIFE_STAGE_CONFIDENCE, SENTIMENT_OVERALL, TEMPERAMENT_SCORE, UNIT_MIDPOINT};
        let finite = |v: f64, default: f64| if v.is_finite() { v } else { default };

        match self {
            Self::Temperament(t) => Self::Temperament(TemperamentSignal {
                score: finite(t.score, TEMPERAMENT_SCORE),
                ..t
            }),
            Self::CommunicationStyle(c) => Self::CommunicationStyle(CommunicationStyleSignal {
                formality: finite(c.formality, UNIT_MIDPOINT),
                verbosity: finite(c.verbosity, UNIT_MIDPOINT),
                technicality: finite(c.technicality, UNIT_MIDPOINT),
                structured: finite(c.structured, UNIT_MIDPOINT),
            }),
            Self::Sentiment(s) => Self::Sentiment(SentimentSignal {
                overall: finite(s.overall, SENTIMENT_OVERALL),
                ..s
            }),
            Self::LifeStage(l) => Self::LifeStage(LifeStageSignal {
                confidence: finite(l.confidence, LIFE_STAGE_CONFIDENCE),
                ..l
            }),
            Self::Cooperation(c) => Self::Cooperation(CooperationSignal {
                follows_instructions: finite(c.follows_instructions, UNIT_MIDPOINT),
                provides_context: finite(c.provides_context, UNIT_MIDPOINT),
                politeness: finite(c.politeness, UNIT_MIDPOINT),
            }),
            topics @ Self::Topics(_) => topics,
        }
    }

    /// The payload alone, without the type tag.
    pub fn payload_json(&self) -> DomainResult<serde_json::Value> {
        let value = match self {
            Self::Temperament(v) => serde_json::to_value(v),
            Self::CommunicationStyle(v) => serde_json::to_value(v),
            Self::Sentiment(v) => serde_json::to_value(v),
            Self::LifeStage(v) => serde_json::to_value(v),
            Self::Topics(v) => serde_json::to_value(v),
            Self::Cooperation(v) => serde_json::to_value(v),
        };
        value.map_err(DomainError::from)
    }
}

/// An immutable, timestamped, confidence-weighted observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: Option<Uuid>,
    #[serde(flatten)]
    pub value: SignalValue,
    /// Extraction confidence in [0,1]
    pub confidence: f64,
    pub extracted_at: DateTime<Utc>,
    pub source_turn: Option<u32>,
}

impl Signal {
    /// Create a signal; confidence is clamped into [0,1] and non-finite
    /// payload readings fall back to their defaults.
    pub fn new(
        user_id: Uuid,
        value: SignalValue,
        confidence: f64,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            conversation_id: None,
            value: value.sanitized(),
            confidence: clamp_or(Some(confidence), 0.0, 1.0, 0.0),
            extracted_at,
            source_turn: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: Uuid) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    pub fn with_source_turn(mut self, turn: u32) -> Self {
        self.source_turn = Some(turn);
        self
    }

    pub fn signal_type(&self) -> SignalType {
        self.value.signal_type()
    }

    /// Elapsed days between extraction and `now` (negative for future timestamps).
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.extracted_at).num_milliseconds() as f64 / 86_400_000.0
    }
}

/// Clamp an optional number into `[lo, hi]`, using `default` when it is
/// missing or not finite.
pub fn clamp_or(value: Option<f64>, lo: f64, hi: f64, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(lo, hi),
        _ => default,
    }
}

/// Loosely-typed temperament as reported by the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTemperament {
    pub score: Option<f64>,
    pub label: Option<String>,
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCommunicationStyle {
    pub formality: Option<f64>,
    pub verbosity: Option<f64>,
    pub technicality: Option<f64>,
    pub structured: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSentiment {
    pub overall: Option<f64>,
    pub arc: Option<String>,
    pub frustration_detected: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLifeStage {
    pub indicators: Option<Vec<String>>,
    pub confidence: Option<f64>,
    pub domain_expertise: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCooperation {
    pub follows_instructions: Option<f64>,
    pub provides_context: Option<f64>,
    pub politeness: Option<f64>,
}

/// Unvalidated extractor output; every field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSignalSet {
    pub temperament: Option<RawTemperament>,
    pub communication_style: Option<RawCommunicationStyle>,
    pub sentiment: Option<RawSentiment>,
    pub life_stage: Option<RawLifeStage>,
    pub topics: Option<Vec<String>>,
    pub cooperation: Option<RawCooperation>,
}

impl RawSignalSet {
    /// Parse extractor text output, tolerating a surrounding markdown code fence.
    pub fn from_json_text(text: &str) -> DomainResult<Self> {
        let trimmed = text.trim();
        let body = if trimmed.starts_with("```") {
            let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
            if lines.last().is_some_and(|l| l.trim() == "```") {
                lines.pop();
            }
            lines.join("\n")
        } else {
            trimmed.to_string()
        };
        Ok(serde_json::from_str(&body)?)
    }
}

/// One validated payload per signal type, produced from a [`RawSignalSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub temperament: TemperamentSignal,
    pub communication_style: CommunicationStyleSignal,
    pub sentiment: SentimentSignal,
    pub life_stage: LifeStageSignal,
    pub topics: TopicsSignal,
    pub cooperation: CooperationSignal,
}

impl SignalSet {
    /// The canonical "nothing extracted" set.
    pub fn empty() -> Self {
        Self {
            temperament: TemperamentSignal::default(),
            communication_style: CommunicationStyleSignal::default(),
            sentiment: SentimentSignal::default(),
            life_stage: LifeStageSignal::default(),
            topics: TopicsSignal::default(),
            cooperation: CooperationSignal::default(),
        }
    }

    /// Validate and clamp raw extractor output.
    pub fn from_raw(raw: RawSignalSet) -> Self {
        let unit = |v: Option<f64>| clamp_or(v, 0.0, 1.0, defaults::UNIT_MIDPOINT);

        let temp = raw.temperament.unwrap_or_default();
        let style = raw.communication_style.unwrap_or_default();
        let sent = raw.sentiment.unwrap_or_default();
        let life = raw.life_stage.unwrap_or_default();
        let coop = raw.cooperation.unwrap_or_default();

        Self {
            temperament: TemperamentSignal {
                score: clamp_or(
                    temp.score,
                    defaults::TEMPERAMENT_MIN,
                    defaults::TEMPERAMENT_MAX,
                    defaults::TEMPERAMENT_SCORE,
                ),
                label: temp
                    .label
                    .unwrap_or_else(|| defaults::TEMPERAMENT_LABEL.to_string()),
                evidence: temp.evidence.unwrap_or_default(),
            },
            communication_style: CommunicationStyleSignal {
                formality: unit(style.formality),
                verbosity: unit(style.verbosity),
                technicality: unit(style.technicality),
                structured: unit(style.structured),
            },
            sentiment: SentimentSignal {
                overall: clamp_or(sent.overall, -1.0, 1.0, defaults::SENTIMENT_OVERALL),
                arc: sent
                    .arc
                    .unwrap_or_else(|| defaults::SENTIMENT_ARC.to_string()),
                frustration_detected: sent.frustration_detected.unwrap_or(false),
            },
            life_stage: LifeStageSignal {
                indicators: life.indicators.unwrap_or_default(),
                confidence: clamp_or(
                    life.confidence,
                    0.0,
                    1.0,
                    defaults::LIFE_STAGE_CONFIDENCE,
                ),
                domain_expertise: life.domain_expertise.unwrap_or_default(),
            },
            topics: TopicsSignal {
                topics: raw.topics.unwrap_or_default(),
            },
            cooperation: CooperationSignal {
                follows_instructions: unit(coop.follows_instructions),
                provides_context: unit(coop.provides_context),
                politeness: unit(coop.politeness),
            },
        }
    }

    /// The six payloads in canonical type order.
    pub fn into_values(self) -> Vec<SignalValue> {
        vec![
            SignalValue::Temperament(self.temperament),
            SignalValue::CommunicationStyle(self.communication_style),
            SignalValue::Sentiment(self.sentiment),
            SignalValue::LifeStage(self.life_stage),
            SignalValue::Topics(self.topics),
            SignalValue::Cooperation(self.cooperation),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signal_type_round_trip_names() {
        for t in SignalType::ALL {
            assert_eq!(SignalType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(SignalType::from_str("mood"), None);
    }

    #[test]
    fn test_new_replaces_non_finite_readings() {
        let now = Utc::now();
        let user = Uuid::new_v4();

        let temperament = Signal::new(
            user,
            SignalValue::Temperament(TemperamentSignal {
                score: f64::NAN,
                label: "calm".to_string(),
                evidence: String::new(),
            }),
            f64::INFINITY,
            now,
        );
        assert_eq!(
            temperament.value,
            SignalValue::Temperament(TemperamentSignal {
                score: defaults::TEMPERAMENT_SCORE,
                label: "calm".to_string(),
                evidence: String::new(),
            })
        );
        assert_eq!(temperament.confidence, 0.0);

        let cooperation = Signal::new(
            user,
            SignalValue::Cooperation(CooperationSignal {
                follows_instructions: f64::NEG_INFINITY,
                provides_context: 0.9,
                politeness: f64::INFINITY,
            }),
            0.7,
            now,
        );
        let SignalValue::Cooperation(c) = cooperation.value else {
            panic!("expected cooperation payload");
        };
        assert_eq!(c.follows_instructions, defaults::UNIT_MIDPOINT);
        assert_eq!(c.provides_context, 0.9);
        assert_eq!(c.politeness, defaults::UNIT_MIDPOINT);
    }

    #[test]
    fn test_from_raw_clamps_out_of_range_values() {
        let raw: RawSignalSet = serde_json::from_value(json!({
            "temperament": {"score": 14, "label": "patient"},
            "communication_style": {"formality": 1.7, "verbosity": -0.2},
            "sentiment": {"overall": -3.0, "frustration_detected": true},
            "life_stage": {"indicators": ["student"], "confidence": 2.0},
            "topics": ["math", "physics"],
            "cooperation": {"politeness": 0.9}
        }))
        .unwrap();

        let set = SignalSet::from_raw(raw);
        assert_eq!(set.temperament.score, 10.0);
        assert_eq!(set.temperament.label, "patient");
        assert_eq!(set.communication_style.formality, 1.0);
        assert_eq!(set.communication_style.verbosity, 0.0);
        assert_eq!(set.communication_style.technicality, 0.5);
        assert_eq!(set.sentiment.overall, -1.0);
        assert!(set.sentiment.frustration_detected);
        assert_eq!(set.life_stage.confidence, 1.0);
        assert_eq!(set.topics.topics, vec!["math", "physics"]);
        assert_eq!(set.cooperation.politeness, 0.9);
        assert_eq!(set.cooperation.follows_instructions, 0.5);
    }

    #[test]
    fn test_from_raw_empty_uses_defaults() {
        let set = SignalSet::from_raw(RawSignalSet::default());
        assert_eq!(set.temperament, TemperamentSignal::default());
        assert_eq!(set.sentiment.arc, "stable");
        // Extracted-but-unscored life stage assumes mid confidence.
        assert_eq!(set.life_stage.confidence, 0.5);
        assert_eq!(SignalSet::empty().life_stage.confidence, 0.0);
    }

    #[test]
    fn test_non_finite_treated_as_missing() {
        assert_eq!(clamp_or(Some(f64::NAN), 0.0, 1.0, 0.5), 0.5);
        assert_eq!(clamp_or(Some(f64::INFINITY), 0.0, 1.0, 0.5), 0.5);
        assert_eq!(clamp_or(None, 0.0, 1.0, 0.25), 0.25);
    }

    #[test]
    fn test_from_json_text_strips_code_fence() {
        let text = "```json\n{\"topics\": [\"law\"]}\n```";
        let raw = RawSignalSet::from_json_text(text).unwrap();
        assert_eq!(raw.topics, Some(vec!["law".to_string()]));
        assert!(RawSignalSet::from_json_text("not json").is_err());
    }

    #[test]
    fn test_from_stored_falls_back_on_malformed_payload() {
        let value = SignalValue::from_stored(SignalType::Temperament, json!({"score": "high"}));
        assert_eq!(value, SignalValue::Temperament(TemperamentSignal::default()));

        let partial = SignalValue::from_stored(SignalType::Cooperation, json!({"politeness": 0.2}));
        match partial {
            SignalValue::Cooperation(c) => {
                assert_eq!(c.politeness, 0.2);
                assert_eq!(c.provides_context, 0.5);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_signal_serializes_with_type_tag() {
        let signal = Signal::new(
            Uuid::new_v4(),
            SignalValue::Topics(TopicsSignal { topics: vec!["rust".into()] }),
            1.4,
            Utc::now(),
        );
        assert_eq!(signal.confidence, 1.0);
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["signal_type"], "topics");
        assert_eq!(json["value"]["topics"][0], "rust");
    }
}
