//! Detect the dominant behavioral arc of a user.
//!
//! Three sub-traits (temperament, engagement, expertise) are each reduced to
//! a recent-versus-historical trend, then a fixed priority table picks one
//! arc label.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ArcReport, BehavioralArc, EvolutionConfig, Signal, SignalValue, SubArc, SubArcs,
    TrendDirection,
};
use crate::domain::ports::{ProfileRepository, SignalOrder, SignalRepository};
use crate::services::temporal::{mean, population_std_dev, round_to, within_window};

/// Mean difference beyond which a sub-trait is trending.
const DIRECTION_THRESHOLD: f64 = 0.5;
/// Floor for the historical spread when testing for a shift.
const MIN_SHIFT_SPREAD: f64 = 0.5;

/// Pure arc analysis over a signal history.
#[derive(Debug, Clone)]
pub struct ArcAnalyzer {
    min_signals: usize,
    recent_window_days: i64,
    historical_window_days: i64,
}

impl Default for ArcAnalyzer {
    fn default() -> Self {
        Self::new(&EvolutionConfig::default())
    }
}

impl ArcAnalyzer {
    pub fn new(config: &EvolutionConfig) -> Self {
        Self {
            min_signals: config.min_arc_signals,
            recent_window_days: config.recent_window_days,
            historical_window_days: config.historical_window_days,
        }
    }

    /// Analyze all of a user's signals (any order).
    pub fn analyze(&self, signals: &[Signal], now: DateTime<Utc>) -> ArcReport {
        if signals.len() < self.min_signals {
            return ArcReport::insufficient_data();
        }

        let temperament = self.sub_arc(signals, now, |v| match v {
            SignalValue::Temperament(t) => Some(t.score),
            _ => None,
        });
        let engagement = self.sub_arc(signals, now, |v| match v {
            SignalValue::CommunicationStyle(c) => Some(c.verbosity),
            SignalValue::Cooperation(c) => Some(c.provides_context),
            _ => None,
        });
        let expertise = self.sub_arc(signals, now, |v| match v {
            SignalValue::CommunicationStyle(c) => Some(c.technicality),
            _ => None,
        });

        let sub_arcs = SubArcs {
            temperament,
            engagement,
            expertise,
        };
        let (arc, confidence) = dominant_arc(&sub_arcs);

        ArcReport {
            arc,
            confidence,
            detail: arc.description().to_string(),
            sub_arcs: Some(sub_arcs),
        }
    }

    /// Trend of the values `value_of` reads from the signals it applies to.
    fn sub_arc<F>(&self, signals: &[Signal], now: DateTime<Utc>, value_of: F) -> SubArc
    where
        F: Fn(&SignalValue) -> Option<f64>,
    {
        let readings: Vec<(DateTime<Utc>, f64)> = signals
            .iter()
            .filter_map(|s| {
                value_of(&s.value)
                    .filter(|v| v.is_finite())
                    .map(|v| (s.extracted_at, v))
            })
            .collect();
        if readings.len() < 2 {
            return SubArc::default();
        }

        let window = |days: i64| -> Vec<f64> {
            readings
                .iter()
                .filter(|(at, _)| within_window(at, days, now))
                .map(|(_, v)| *v)
                .collect()
        };
        let recent = window(self.recent_window_days);
        let historical = window(self.historical_window_days);
        if recent.is_empty() || historical.is_empty() {
            return SubArc::default();
        }

        let recent_mean = mean(&recent);
        let historical_mean = mean(&historical);
        let diff = recent_mean - historical_mean;
        let spread = population_std_dev(&historical).max(MIN_SHIFT_SPREAD);

        let direction = if diff > DIRECTION_THRESHOLD {
            TrendDirection::Increasing
        } else if diff < -DIRECTION_THRESHOLD {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        SubArc {
            direction,
            magnitude: round_to(diff.abs(), 2),
            shift_detected: diff.abs() > 2.0 * spread,
            recent_mean: Some(round_to(recent_mean, 2)),
            historical_mean: Some(round_to(historical_mean, 2)),
        }
    }
}

/// Priority table: the first matching rule wins.
fn dominant_arc(sub: &SubArcs) -> (BehavioralArc, f64) {
    use TrendDirection::{Decreasing, Increasing};
    let (temperament, engagement, expertise) = (&sub.temperament, &sub.engagement, &sub.expertise);
    let capped = |x: f64| x.min(1.0);

    if temperament.is(Increasing) && temperament.shift_detected {
        return (BehavioralArc::Rehabilitation, capped(temperament.magnitude / 3.0));
    }
    if engagement.is(Decreasing) && engagement.shift_detected {
        return (BehavioralArc::Churn, capped(engagement.magnitude / 0.5));
    }
    if expertise.is(Increasing) && expertise.shift_detected {
        return (BehavioralArc::Growth, capped(expertise.magnitude / 0.5));
    }
    if temperament.is(Decreasing) || engagement.is(Decreasing) {
        let magnitude = temperament.magnitude.max(engagement.magnitude);
        return (BehavioralArc::Cooling, capped(magnitude / 2.0));
    }
    if temperament.is(Increasing) {
        return (BehavioralArc::Warming, capped(temperament.magnitude / 2.0));
    }

    let shifts = [temperament, engagement, expertise]
        .iter()
        .filter(|s| s.shift_detected)
        .count();
    if shifts >= 2 {
        return (BehavioralArc::Volatile, 0.7);
    }
    (BehavioralArc::Stable, 0.5)
}

/// Arc detection service: analyzes stored signals and records the label on
/// the user's profile.
pub struct ArcDetector<R>
where
    R: SignalRepository + ProfileRepository,
{
    repository: Arc<R>,
    analyzer: ArcAnalyzer,
}

impl<R> ArcDetector<R>
where
    R: SignalRepository + ProfileRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_config(repository, &EvolutionConfig::default())
    }

    pub fn with_config(repository: Arc<R>, config: &EvolutionConfig) -> Self {
        Self {
            repository,
            analyzer: ArcAnalyzer::new(config),
        }
    }

    pub fn analyzer(&self) -> &ArcAnalyzer {
        &self.analyzer
    }

    pub async fn detect_arc(&self, user_id: Uuid) -> DomainResult<ArcReport> {
        self.detect_arc_at(user_id, Utc::now()).await
    }

    /// Detect the arc and, when there was enough data and the user has a
    /// profile, store it as the profile's current arc.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn detect_arc_at(&self, user_id: Uuid, now: DateTime<Utc>) -> DomainResult<ArcReport> {
        let signals = self
            .repository
            .list_signals(user_id, None, SignalOrder::OldestFirst)
            .await?;
        let report = self.analyzer.analyze(&signals, now);
        if report.sub_arcs.is_none() {
            debug!(signals = signals.len(), "not enough signals for arc detection");
            return Ok(report);
        }

        if let Some(mut profile) = self.repository.get_profile(user_id).await? {
            profile.current_arc = Some(report.arc);
            self.repository.save_profile(&profile).await?;
        }

        debug!(arc = %report.arc, confidence = report.confidence, "arc detected");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::models::{CommunicationStyleSignal, CooperationSignal, TemperamentSignal};
    use chrono::Duration;

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

    fn cooperation(user: Uuid, provides_context: f64, days_ago: i64, now: DateTime<Utc>) -> Signal {
        Signal::new(
            user,
            SignalValue::Cooperation(CooperationSignal {
                provides_context,
                ..Default::default()
            }),
            0.8,
            now - Duration::days(days_ago),
        )
    }

    #[test]
    fn test_insufficient_data() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let signals = vec![temperament(user, 2.0, 5, now), temperament(user, 9.0, 1, now)];

        let report = ArcAnalyzer::default().analyze(&signals, now);
        assert_eq!(report.arc, BehavioralArc::Stable);
        assert_eq!(report.confidence, 0.0);
        assert!(report.sub_arcs.is_none());
    }

    #[test]
    fn test_sharp_temperament_rise_is_rehabilitation() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let mut signals: Vec<Signal> = (0..10)
            .map(|i| temperament(user, 2.0, 85 - i * 5, now))
            .collect();
        signals.push(temperament(user, 9.0, 10, now));
        signals.push(temperament(user, 9.0, 3, now));

        let report = ArcAnalyzer::default().analyze(&signals, now);
        let sub = report.sub_arcs.as_ref().unwrap();
        assert_eq!(sub.temperament.direction, TrendDirection::Increasing);
        assert!(sub.temperament.shift_detected);
        assert_eq!(sub.temperament.recent_mean, Some(9.0));
        assert_eq!(sub.temperament.historical_mean, Some(3.17));
        assert_eq!(sub.temperament.magnitude, 5.83);
        assert_eq!(report.arc, BehavioralArc::Rehabilitation);
        assert_eq!(report.confidence, 1.0);
        assert_eq!(report.detail, "hostile → neutral → cooperative");
    }

    #[test]
    fn test_mild_temperament_rise_is_warming() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let mut signals: Vec<Signal> = (0..4)
            .map(|i| temperament(user, 4.0, 80 - i * 10, now))
            .collect();
        signals.extend((0..2).map(|i| temperament(user, 6.0, 10 - i * 5, now)));
        signals.push(temperament(user, 2.0, 60, now));
        signals.push(temperament(user, 8.0, 50, now));

        let report = ArcAnalyzer::default().analyze(&signals, now);
        let sub = report.sub_arcs.as_ref().unwrap();
        assert_eq!(sub.temperament.direction, TrendDirection::Increasing);
        assert!(!sub.temperament.shift_detected);
        assert_eq!(report.arc, BehavioralArc::Warming);
        assert!(report.confidence > 0.0 && report.confidence <= 1.0);
    }

    #[test]
    fn test_engagement_drop_is_cooling() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let mut signals: Vec<Signal> = (0..5)
            .map(|i| cooperation(user, 1.0, 80 - i * 8, now))
            .collect();
        signals.push(cooperation(user, 0.0, 12, now));
        signals.push(cooperation(user, 0.0, 4, now));

        // Engagement lives in [0,1], below the shift floor, so a drop reads as cooling.
        let report = ArcAnalyzer::default().analyze(&signals, now);
        let engagement = &report.sub_arcs.as_ref().unwrap().engagement;
        assert_eq!(engagement.direction, TrendDirection::Decreasing);
        assert!(!engagement.shift_detected);
        assert_eq!(engagement.magnitude, 0.71);
        assert_eq!(report.arc, BehavioralArc::Cooling);
        assert!((report.confidence - 0.355).abs() < 1e-9);
    }

    #[test]
    fn test_flat_history_is_stable() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let style = |days: i64| {
            Signal::new(
                user,
                SignalValue::CommunicationStyle(CommunicationStyleSignal::default()),
                0.7,
                now - Duration::days(days),
            )
        };
        let signals = vec![style(60), style(40), style(10), style(2)];

        let report = ArcAnalyzer::default().analyze(&signals, now);
        assert_eq!(report.arc, BehavioralArc::Stable);
        assert_eq!(report.confidence, 0.5);
    }

    #[test]
    fn test_dominant_arc_priority() {
        let shifted = |direction| SubArc {
            direction,
            magnitude: 1.0,
            shift_detected: true,
            ..Default::default()
        };

        let all_shifting_stable = SubArcs {
            temperament: shifted(TrendDirection::Stable),
            engagement: shifted(TrendDirection::Stable),
            expertise: SubArc::default(),
        };
        assert_eq!(dominant_arc(&all_shifting_stable), (BehavioralArc::Volatile, 0.7));

        let growth = SubArcs {
            expertise: shifted(TrendDirection::Increasing),
            ..Default::default()
        };
        assert_eq!(dominant_arc(&growth), (BehavioralArc::Growth, 1.0));

        let churn_beats_growth = SubArcs {
            engagement: shifted(TrendDirection::Decreasing),
            expertise: shifted(TrendDirection::Increasing),
            ..Default::default()
        };
        assert_eq!(dominant_arc(&churn_beats_growth).0, BehavioralArc::Churn);

        let cooling = SubArcs {
            temperament: SubArc {
                direction: TrendDirection::Decreasing,
                magnitude: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(dominant_arc(&cooling), (BehavioralArc::Cooling, 0.5));
    }

    #[tokio::test]
    async fn test_detect_arc_updates_existing_profile_only() {
        let store = Arc::new(MemoryStore::new());
        let detector = ArcDetector::new(store.clone());
        let now = Utc::now();
        let user = Uuid::new_v4();
        for (score, days) in [(2.0, 80), (2.0, 70), (9.0, 5), (9.0, 2)] {
            store.append_signal(&temperament(user, score, days, now)).await.unwrap();
        }

        // No profile yet: nothing is written.
        detector.detect_arc_at(user, now).await.unwrap();
        assert!(store.get_profile(user).await.unwrap().is_none());

        store.get_or_create_profile(user).await.unwrap();
        let report = detector.detect_arc_at(user, now).await.unwrap();
        let profile = store.get_profile(user).await.unwrap().unwrap();
        assert_eq!(profile.current_arc, Some(report.arc));
    }
}
