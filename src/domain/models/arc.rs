//! Behavioral arc labels and trend analysis results.

use serde::{Deserialize, Serialize};

/// The dominant multi-week behavioral trajectory of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehavioralArc {
    Rehabilitation,
    Churn,
    Growth,
    Stable,
    Volatile,
    Warming,
    Cooling,
}

impl BehavioralArc {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rehabilitation => "rehabilitation",
            Self::Churn => "churn",
            Self::Growth => "growth",
            Self::Stable => "stable",
            Self::Volatile => "volatile",
            Self::Warming => "warming",
            Self::Cooling => "cooling",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rehabilitation" => Some(Self::Rehabilitation),
            "churn" => Some(Self::Churn),
            "growth" => Some(Self::Growth),
            "stable" => Some(Self::Stable),
            "volatile" => Some(Self::Volatile),
            "warming" => Some(Self::Warming),
            "cooling" => Some(Self::Cooling),
            _ => None,
        }
    }

    /// Canonical narrative for the arc.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Rehabilitation => "hostile → neutral → cooperative",
            Self::Churn => "engaged → declining → disengaged",
            Self::Growth => "casual → technical → expert",
            Self::Stable => "consistent behavior over time",
            Self::Volatile => "unpredictable behavior pattern",
            Self::Warming => "cold → warming → engaged",
            Self::Cooling => "engaged → cooling → disengaged",
        }
    }
}

impl std::fmt::Display for BehavioralArc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simple recent-vs-historical divergence emitted by conflict resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    Growth,
    Declining,
    Stable,
}

impl Divergence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Growth => "growth",
            Self::Declining => "declining",
            Self::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

/// Trend of one sub-trait (temperament, engagement or expertise).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubArc {
    pub direction: TrendDirection,
    /// |recent mean − historical mean|, two decimals
    pub magnitude: f64,
    pub shift_detected: bool,
    pub recent_mean: Option<f64>,
    pub historical_mean: Option<f64>,
}

impl SubArc {
    pub fn is(&self, direction: TrendDirection) -> bool {
        self.direction == direction
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubArcs {
    pub temperament: SubArc,
    pub engagement: SubArc,
    pub expertise: SubArc,
}

/// Result of arc detection for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcReport {
    pub arc: BehavioralArc,
    pub confidence: f64,
    pub detail: String,
    pub sub_arcs: Option<SubArcs>,
}

impl ArcReport {
    /// Report used when there is too little history to judge a trend.
    pub fn insufficient_data() -> Self {
        Self {
            arc: BehavioralArc::Stable,
            confidence: 0.0,
            detail: "Insufficient data".to_string(),
            sub_arcs: None,
        }
    }
}
