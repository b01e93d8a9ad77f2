use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use traitscope::domain::models::{
    CooperationSignal, ScoringConfig, SentimentSignal, Signal, SignalValue, TemperamentSignal,
};
use traitscope::services::temporal::{mean, population_std_dev, weighted_mean};
use traitscope::services::{ArcAnalyzer, ConflictResolver, ScoreEngine};
use uuid::Uuid;

/// One raw observation: (kind, reading, confidence, age in days).
fn observation() -> impl Strategy<Value = (u8, f64, f64, i64)> {
    (0u8..3, -50.0f64..50.0, 0.0f64..=1.0, 0i64..400)
}

fn build_signals(user_id: Uuid, observations: &[(u8, f64, f64, i64)]) -> Vec<Signal> {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    observations
        .iter()
        .map(|&(kind, reading, confidence, age)| {
            let value = match kind {
                0 => SignalValue::Temperament(TemperamentSignal {
                    score: reading,
                    label: "observed".to_string(),
                    evidence: String::new(),
                }),
                1 => SignalValue::Sentiment(SentimentSignal {
                    overall: reading,
                    arc: "stable".to_string(),
                    frustration_detected: reading < 0.0,
                }),
                _ => SignalValue::Cooperation(CooperationSignal {
                    follows_instructions: reading,
                    provides_context: -reading,
                    politeness: reading / 2.0,
                }),
            };
            Signal::new(user_id, value, confidence, now - Duration::days(age))
        })
        .collect()
}

/// A reading that is sometimes NaN or infinite.
fn reading() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => -50.0f64..50.0,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
    ]
}

/// Payloads assigned after construction, so no validation has run on them.
fn unchecked_signals(user_id: Uuid, observations: &[(u8, f64, f64, i64)]) -> Vec<Signal> {
    build_signals(user_id, observations)
        .into_iter()
        .zip(observations)
        .map(|(mut signal, &(_, reading, confidence, _))| {
            signal.confidence = confidence;
            match &mut signal.value {
                SignalValue::Temperament(t) => t.score = reading,
                SignalValue::Sentiment(s) => s.overall = reading,
                SignalValue::Cooperation(c) => {
                    c.follows_instructions = reading;
                    c.politeness = reading;
                }
                _ => {}
            }
            signal
        })
        .collect()
}

proptest! {
    /// Property: non-finite readings and confidences never push a score out
    /// of bounds, whether or not they went through `Signal::new`.
    #[test]
    fn prop_non_finite_readings_keep_scores_bounded(
        observations in prop::collection::vec((0u8..3, reading(), reading(), 0i64..400), 1..30),
    ) {
        let user_id = Uuid::new_v4();
        let config = ScoringConfig::default();
        let engine = ScoreEngine::new(&config);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        for signals in [build_signals(user_id, &observations), unchecked_signals(user_id, &observations)] {
            for score in engine.score_all(user_id, &signals, &[], now) {
                prop_assert!(
                    score.score >= 0.0 && score.score <= 100.0,
                    "{} out of bounds: {}", score.dimension, score.score
                );
            }
        }
    }

    /// Property: every stored score lies within its dimension's bounds,
    /// whatever the (possibly out-of-range) signal payloads look like.
    #[test]
    fn prop_scores_within_dimension_bounds(
        observations in prop::collection::vec(observation(), 0..40),
        previous in prop::option::of(0.0f64..=100.0),
    ) {
        let user_id = Uuid::new_v4();
        let signals = build_signals(user_id, &observations);
        let config = ScoringConfig::default();
        let engine = ScoreEngine::new(&config);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        for dimension in &config.dimensions {
            let score = engine.score_dimension(user_id, dimension, &signals, previous, now);
            prop_assert!(score.score >= dimension.min_score);
            prop_assert!(score.score <= dimension.max_score);
            prop_assert!(score.components.len() <= config.max_components);
            prop_assert!(!score.reasoning.is_empty());
        }
    }

    /// Property: a weighted mean with non-negative weights stays within the
    /// range of its values.
    #[test]
    fn prop_weighted_mean_bounded(
        pairs in prop::collection::vec((-1000.0f64..1000.0, 0.0f64..10.0), 1..50)
    ) {
        let (values, weights): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let m = weighted_mean(&values, &weights);
        prop_assert!(m >= lo - 1e-9 && m <= hi + 1e-9, "{} not in [{}, {}]", m, lo, hi);

        let plain = mean(&values);
        prop_assert!(plain >= lo - 1e-9 && plain <= hi + 1e-9);
    }

    /// Property: population standard deviation is never negative.
    #[test]
    fn prop_std_dev_non_negative(values in prop::collection::vec(-1e6f64..1e6, 0..50)) {
        prop_assert!(population_std_dev(&values) >= 0.0);
    }

    /// Property: conflict resolution confidence stays in [0, 1].
    #[test]
    fn prop_resolver_confidence_in_unit_interval(
        observations in prop::collection::vec(observation(), 0..40)
    ) {
        let signals = build_signals(Uuid::new_v4(), &observations);
        let resolver = ConflictResolver::default();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let resolved = resolver.resolve(
            &signals,
            |s| match &s.value {
                SignalValue::Temperament(t) => Some(t.score),
                SignalValue::Sentiment(se) => Some(se.overall),
                SignalValue::Cooperation(c) => Some(c.follows_instructions),
                _ => None,
            },
            now,
        );
        prop_assert!((0.0..=1.0).contains(&resolved.confidence));
    }

    /// Property: arc confidence stays in [0, 1].
    #[test]
    fn prop_arc_confidence_in_unit_interval(
        observations in prop::collection::vec(observation(), 0..40)
    ) {
        let signals = build_signals(Uuid::new_v4(), &observations);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let report = ArcAnalyzer::default().analyze(&signals, now);
        prop_assert!((0.0..=1.0).contains(&report.confidence));
    }
}
