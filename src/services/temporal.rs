//! Recency weighting and small-sample statistics.
//!
//! Two deliberately different decay schemes live here: a smooth
//! exponential curve ([`recency_weight`]) used by score calculation, and a
//! coarse step function ([`temporal_weight`]) used by conflict resolution
//! and arc analysis.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::domain::models::Signal;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A timestamp that can be interpreted in UTC.
///
/// Naive timestamps carry no zone and are read as UTC.
pub trait AsUtc {
    fn as_utc(&self) -> DateTime<Utc>;
}

impl<Tz: TimeZone> AsUtc for DateTime<Tz> {
    fn as_utc(&self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }
}

impl AsUtc for NaiveDateTime {
    fn as_utc(&self) -> DateTime<Utc> {
        self.and_utc()
    }
}

/// Elapsed days from `timestamp` to `now`, fractional; negative for the future.
pub fn elapsed_days(timestamp: &impl AsUtc, now: DateTime<Utc>) -> f64 {
    (now - timestamp.as_utc()).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
}

/// Exponential decay `exp(-λ·max(0, age))`.
pub fn recency_weight(age_days: f64, lambda: f64) -> f64 {
    (-lambda * age_days.max(0.0)).exp()
}

/// Stepped decay: ≤30d → 1.0, ≤90d → 0.6, ≤180d → 0.3, older → 0.1.
pub fn temporal_weight(timestamp: &impl AsUtc, now: DateTime<Utc>) -> f64 {
    let days = elapsed_days(timestamp, now);
    if days <= 30.0 {
        1.0
    } else if days <= 90.0 {
        0.6
    } else if days <= 180.0 {
        0.3
    } else {
        0.1
    }
}

/// Σ(v·w)/Σw, or the plain mean when the weights sum to zero. Empty input is 0.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total: f64 = weights.iter().take(values.len()).sum();
    if total == 0.0 {
        return mean(values);
    }
    values
        .iter()
        .zip(weights)
        .map(|(v, w)| v * w)
        .sum::<f64>()
        / total
}

/// Arithmetic mean; 0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation; 0 for fewer than two values.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Whether `timestamp` is at most `days` old (inclusive). Future
/// timestamps fall inside every window.
pub fn within_window(timestamp: &impl AsUtc, days: i64, now: DateTime<Utc>) -> bool {
    elapsed_days(timestamp, now) <= days as f64
}

/// Signals whose age is at most `days`.
pub fn signals_in_window(signals: &[Signal], days: i64, now: DateTime<Utc>) -> Vec<&Signal> {
    signals
        .iter()
        .filter(|s| within_window(&s.extracted_at, days, now))
        .collect()
}
