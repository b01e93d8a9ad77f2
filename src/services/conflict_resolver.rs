//! Resolve disagreeing observations of one trait into a single value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::{clamp_or, Divergence, EvolutionConfig, Signal, Volatility};
use crate::services::temporal::{
    mean, population_std_dev, signals_in_window, temporal_weight, weighted_mean,
};

/// Mean shift between windows that counts as a divergence.
const DIVERGENCE_THRESHOLD: f64 = 1.5;
const HIGH_VOLATILITY_ABOVE: f64 = 3.0;
const MEDIUM_VOLATILITY_ABOVE: f64 = 1.5;

/// Consolidated reading of one trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTrait {
    pub value: f64,
    /// In [0,1]
    pub confidence: f64,
    pub volatility: Volatility,
    pub divergence: Option<Divergence>,
    pub note: String,
}

impl ResolvedTrait {
    fn empty(note: &str) -> Self {
        Self {
            value: 0.0,
            confidence: 0.0,
            volatility: Volatility::Low,
            divergence: None,
            note: note.to_string(),
        }
    }
}

/// Compares a recent window against the longer history to decide whether
/// recent behavior can be trusted on its own.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    consistency_threshold: f64,
    recent_window_days: i64,
    historical_window_days: i64,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(&EvolutionConfig::default())
    }
}

impl ConflictResolver {
    pub fn new(config: &EvolutionConfig) -> Self {
        Self {
            consistency_threshold: config.consistency_threshold,
            recent_window_days: config.recent_window_days,
            historical_window_days: config.historical_window_days,
        }
    }

    /// Resolve `signals` (all of one trait type) using `value_of` to read
    /// the numeric value of each. Signals yielding `None` are ignored.
    pub fn resolve<F>(&self, signals: &[Signal], value_of: F, now: DateTime<Utc>) -> ResolvedTrait
    where
        F: Fn(&Signal) -> Option<f64>,
    {
        if signals.is_empty() {
            return ResolvedTrait::empty("No signals available");
        }

        // (value, temporal weight × confidence) for every usable signal
        let weighted = |subset: &[&Signal]| -> (Vec<f64>, Vec<f64>) {
            subset
                .iter()
                .copied()
                .filter_map(|s| {
                    let confidence = clamp_or(Some(s.confidence), 0.0, 1.0, 0.0);
                    value_of(s)
                        .filter(|v| v.is_finite())
                        .map(|v| (v, temporal_weight(&s.extracted_at, now) * confidence))
                })
                .unzip()
        };

        let all: Vec<&Signal> = signals.iter().collect();
        let (values, weights) = weighted(&all);
        if values.is_empty() {
            return ResolvedTrait::empty("No extractable values");
        }

        let recent = signals_in_window(signals, self.recent_window_days, now);
        let historical = signals_in_window(signals, self.historical_window_days, now);
        let (recent_values, recent_weights) = weighted(&recent);
        let (historical_values, _) = weighted(&historical);

        if !recent_values.is_empty()
            && population_std_dev(&recent_values) < self.consistency_threshold
        {
            let divergence = detect_divergence(&historical_values, &recent_values);
            let note = match divergence {
                Some(d) if d != Divergence::Stable => {
                    format!("Consistent recent behavior diverges from historical ({})", d.as_str())
                }
                _ => "Consistent recent behavior".to_string(),
            };
            return ResolvedTrait {
                value: weighted_mean(&recent_values, &recent_weights),
                confidence: (0.5 + 0.1 * recent_values.len() as f64).min(1.0),
                volatility: Volatility::Low,
                divergence,
                note,
            };
        }

        let std_dev = population_std_dev(&values);
        ResolvedTrait {
            value: weighted_mean(&values, &weights),
            confidence: (0.5 - 0.1 * std_dev).max(0.1),
            volatility: Volatility::from_std_dev(
                std_dev,
                MEDIUM_VOLATILITY_ABOVE,
                HIGH_VOLATILITY_ABOVE,
            ),
            divergence: None,
            note: format!("Inconsistent signals (std={std_dev:.2}): context-dependent behavior"),
        }
    }
}

/// Label the shift from historical to recent means; `None` when either
/// window is empty.
pub fn detect_divergence(historical: &[f64], recent: &[f64]) -> Option<Divergence> {
    if historical.is_empty() || recent.is_empty() {
        return None;
    }
    let diff = mean(recent) - mean(historical);
    Some(if diff > DIVERGENCE_THRESHOLD {
        Divergence::Growth
    } else if diff < -DIVERGENCE_THRESHOLD {
        Divergence::Declining
    } else {
        Divergence::Stable
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{SignalValue, TemperamentSignal};
    use chrono::Duration;
    use uuid::Uuid;

    fn temperament(user: Uuid, score: f64, days_ago: i64, now: DateTime<Utc>) -> Signal {
        Signal::new(
            user,
            SignalValue::Temperament(TemperamentSignal {
                score,
                ..Default::default()
            }),
            0.8,
            now - Duration::days(days_ago),
        )
    }

    fn score_of(s: &Signal) -> Option<f64> {
        match &s.value {
            SignalValue::Temperament(t) => Some(t.score),
            _ => None,
        }
    }

    #[test]
    fn test_non_finite_readings_are_ignored() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let mut poisoned = temperament(user, 7.0, 1, now);
        poisoned.value = SignalValue::Temperament(TemperamentSignal {
            score: f64::INFINITY,
            ..Default::default()
        });
        poisoned.confidence = f64::NAN;
        let signals = vec![poisoned, temperament(user, 7.0, 2, now)];

        let resolved = ConflictResolver::default().resolve(&signals, score_of, now);
        assert!((resolved.value - 7.0).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&resolved.confidence));
    }

    #[test]
    fn test_empty_input() {
        let resolved = ConflictResolver::default().resolve(&[], score_of, Utc::now());
        assert_eq!(resolved.value, 0.0);
        assert_eq!(resolved.confidence, 0.0);
        assert_eq!(resolved.volatility, Volatility::Low);
        assert_eq!(resolved.note, "No signals available");
    }

    #[test]
    fn test_no_extractable_values() {
        let now = Utc::now();
        let signals = vec![temperament(Uuid::new_v4(), 5.0, 1, now)];
        let resolved = ConflictResolver::default().resolve(&signals, |_| None, now);
        assert_eq!(resolved.value, 0.0);
        assert_eq!(resolved.confidence, 0.0);
        assert_eq!(resolved.note, "No extractable values");
    }

    #[test]
    fn test_consistent_recent_cluster_wins() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let signals = vec![
            temperament(user, 2.0, 80, now),
            temperament(user, 3.0, 70, now),
            temperament(user, 7.0, 10, now),
            temperament(user, 7.2, 5, now),
            temperament(user, 6.8, 1, now),
        ];

        let resolved = ConflictResolver::default().resolve(&signals, score_of, now);
        assert_eq!(resolved.volatility, Volatility::Low);
        assert!(resolved.confidence > 0.5);
        assert!((resolved.value - 7.0).abs() < 0.1);
        assert_eq!(resolved.divergence, Some(Divergence::Growth));
        assert!(resolved.note.contains("growth"));
    }

    #[test]
    fn test_alternating_recent_values_are_volatile() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let signals: Vec<Signal> = (0..6)
            .map(|i| temperament(user, if i % 2 == 0 { 1.0 } else { 9.0 }, i, now))
            .collect();

        let resolved = ConflictResolver::default().resolve(&signals, score_of, now);
        assert!(matches!(resolved.volatility, Volatility::Medium | Volatility::High));
        assert!(resolved.divergence.is_none());
        assert!((0.1..=0.5).contains(&resolved.confidence));
        assert!(resolved.note.starts_with("Inconsistent signals (std=4.00)"));
    }

    #[test]
    fn test_only_old_signals_use_all_values() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let signals = vec![temperament(user, 4.0, 200, now), temperament(user, 6.0, 220, now)];

        let resolved = ConflictResolver::default().resolve(&signals, score_of, now);
        assert!((resolved.value - 5.0).abs() < 1e-9);
        assert_eq!(resolved.volatility, Volatility::Low);
        assert!((resolved.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_detect_divergence() {
        assert_eq!(detect_divergence(&[], &[5.0]), None);
        assert_eq!(detect_divergence(&[5.0], &[5.5]), Some(Divergence::Stable));
        assert_eq!(detect_divergence(&[8.0], &[5.0]), Some(Divergence::Declining));
    }
}
