//! Consolidate a user's signal history into profile traits.
//!
//! Each trait has its own rule; numeric consolidation goes through
//! [`crate::services::temporal`]. This is the only code that writes the
//! trait fields of a [`Profile`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    clamp_or, CommunicationStyleSignal, CommunicationStyleTrait, InteractionStats, LifeStageSignal,
    LifeStageTrait, Profile, SentimentDirection, SentimentSignal, SentimentTrend, Signal,
    SignalValue, TemperamentSignal, TemperamentTrait, TopicInterests, Volatility,
};
use crate::domain::models::signal::defaults;
use crate::domain::ports::{ProfileRepository, SignalOrder, SignalRepository};
use crate::services::temporal::{mean, population_std_dev, round_to, weighted_mean};

const TEMPERAMENT_HIGH_VOLATILITY_ABOVE: f64 = 2.5;
const TEMPERAMENT_MEDIUM_VOLATILITY_ABOVE: f64 = 1.5;
/// Number of latest sentiment readings compared against the rest.
const SENTIMENT_RECENT_COUNT: usize = 5;
const SENTIMENT_SHIFT: f64 = 0.2;
const STYLE_LOW: f64 = 0.3;
const STYLE_HIGH: f64 = 0.7;
const PRIMARY_TOPICS: usize = 3;
const SECONDARY_TOPICS: usize = 5;
const TOP_DOMAINS: usize = 5;
const TOP_INDICATORS: usize = 5;

pub struct ProfileAggregator<R>
where
    R: SignalRepository + ProfileRepository,
{
    repository: Arc<R>,
}

impl<R> ProfileAggregator<R>
where
    R: SignalRepository + ProfileRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Rebuild and persist the profile of `user_id` from all of their signals.
    pub async fn aggregate(&self, user_id: Uuid) -> DomainResult<Profile> {
        self.aggregate_at(user_id, Utc::now()).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn aggregate_at(&self, user_id: Uuid, now: DateTime<Utc>) -> DomainResult<Profile> {
        let signals = self
            .repository
            .list_signals(user_id, None, SignalOrder::OldestFirst)
            .await?;
        let base = self.repository.get_or_create_profile(user_id).await?;

        let profile = build_profile(base, &signals, now);
        self.repository.save_profile(&profile).await?;

        debug!(
            version = profile.profile_version,
            signals = signals.len(),
            "profile aggregated"
        );
        Ok(profile)
    }
}

/// Recompute every trait of `base` from `signals` (oldest first), bump the
/// version and stamp `updated_at`. Identity, language and arc are kept.
pub fn build_profile(base: Profile, signals: &[Signal], now: DateTime<Utc>) -> Profile {
    if signals.is_empty() {
        warn!(user_id = %base.user_id, "no signals found, resetting traits to defaults");
    }

    let mut temperament = Vec::new();
    let mut style = Vec::new();
    let mut sentiment = Vec::new();
    let mut life_stage = Vec::new();
    let mut topics: Vec<&str> = Vec::new();

    // Payloads built outside `Signal::new` may still carry non-finite readings.
    let readings: Vec<(SignalValue, f64)> = signals
        .iter()
        .map(|s| (s.value.clone().sanitized(), clamp_or(Some(s.confidence), 0.0, 1.0, 0.0)))
        .collect();

    for (value, confidence) in &readings {
        match value {
            SignalValue::Temperament(t) => temperament.push((t, *confidence)),
            SignalValue::CommunicationStyle(c) => style.push((c, *confidence)),
            SignalValue::Sentiment(s) => sentiment.push(s),
            SignalValue::LifeStage(l) => life_stage.push(l),
            SignalValue::Topics(t) => topics.extend(t.topics.iter().map(String::as_str)),
            SignalValue::Cooperation(_) => {}
        }
    }

    Profile {
        temperament: aggregate_temperament(&temperament),
        communication_style: aggregate_communication_style(&style),
        sentiment_trend: aggregate_sentiment(&sentiment),
        life_stage: aggregate_life_stage(&life_stage),
        topic_interests: aggregate_topics(&topics),
        interaction_stats: interaction_stats(signals),
        profile_version: base.profile_version + 1,
        updated_at: now,
        ..base
    }
}

fn aggregate_temperament(signals: &[(&TemperamentSignal, f64)]) -> TemperamentTrait {
    if signals.is_empty() {
        return TemperamentTrait::default();
    }

    let scores: Vec<f64> = signals.iter().map(|(t, _)| t.score).collect();
    let confidences: Vec<f64> = signals.iter().map(|(_, c)| *c).collect();
    let avg = weighted_mean(&scores, &confidences)
        .clamp(defaults::TEMPERAMENT_MIN, defaults::TEMPERAMENT_MAX);

    let label = tally(signals.iter().map(|(t, _)| t.label.as_str()))
        .into_iter()
        .next()
        .map_or_else(|| defaults::TEMPERAMENT_LABEL.to_string(), |(l, _)| l.to_string());

    let volatility = Volatility::from_std_dev(
        population_std_dev(&scores),
        TEMPERAMENT_MEDIUM_VOLATILITY_ABOVE,
        TEMPERAMENT_HIGH_VOLATILITY_ABOVE,
    );

    TemperamentTrait {
        score: round_to(avg, 1),
        summary: format!("User is generally {label} (avg {avg:.1}/10, {volatility} volatility)"),
        label,
        volatility,
    }
}

fn aggregate_communication_style(
    signals: &[(&CommunicationStyleSignal, f64)],
) -> CommunicationStyleTrait {
    if signals.is_empty() {
        return CommunicationStyleTrait::default();
    }

    let weights: Vec<f64> = signals.iter().map(|(_, c)| *c).collect();
    let dim = |read: fn(&CommunicationStyleSignal) -> f64| {
        let values: Vec<f64> = signals.iter().map(|(s, _)| read(s)).collect();
        round_to(weighted_mean(&values, &weights), 2)
    };

    let formality = dim(|s| s.formality);
    let verbosity = dim(|s| s.verbosity);
    let technicality = dim(|s| s.technicality);
    let structured = dim(|s| s.structured);

    let mut tags = Vec::new();
    for (value, low, high) in [
        (formality, "casual", "formal"),
        (verbosity, "concise", "verbose"),
        (technicality, "non-technical", "technical"),
    ] {
        if value > STYLE_HIGH {
            tags.push(high);
        } else if value < STYLE_LOW {
            tags.push(low);
        }
    }

    CommunicationStyleTrait {
        formality,
        verbosity,
        technicality,
        structured,
        summary: if tags.is_empty() {
            "balanced style".to_string()
        } else {
            tags.join(", ")
        },
    }
}

fn aggregate_sentiment(signals: &[&SentimentSignal]) -> SentimentTrend {
    if signals.is_empty() {
        return SentimentTrend::default();
    }

    let overall: Vec<f64> = signals.iter().map(|s| s.overall).collect();
    let split = overall.len().saturating_sub(SENTIMENT_RECENT_COUNT);
    let (older, recent) = overall.split_at(split);
    let recent_avg = mean(recent);

    let direction = if older.is_empty() {
        SentimentDirection::Stable
    } else {
        let diff = recent_avg - mean(older);
        if diff > SENTIMENT_SHIFT {
            SentimentDirection::Improving
        } else if diff < -SENTIMENT_SHIFT {
            SentimentDirection::Declining
        } else {
            SentimentDirection::Stable
        }
    };

    let frustrated = signals.iter().filter(|s| s.frustration_detected).count();

    SentimentTrend {
        direction,
        recent_avg: round_to(recent_avg, 2),
        frustration_rate: round_to(frustrated as f64 / signals.len() as f64, 2),
        summary: format!(
            "Sentiment is {} (recent avg: {recent_avg:.2})",
            direction.as_str()
        ),
    }
}

fn aggregate_life_stage(signals: &[&LifeStageSignal]) -> LifeStageTrait {
    if signals.is_empty() {
        return LifeStageTrait::default();
    }

    let indicators = tally(signals.iter().flat_map(|s| s.indicators.iter().map(String::as_str)));
    let domains = tally(
        signals
            .iter()
            .flat_map(|s| s.domain_expertise.iter().map(String::as_str)),
    );

    let (stage, stage_count) = indicators
        .first()
        .map_or(("unknown", 0), |(stage, count)| (*stage, *count));

    LifeStageTrait {
        stage: stage.to_string(),
        confidence: round_to((stage_count as f64 / signals.len() as f64).min(1.0), 2),
        domain_expertise: domains
            .iter()
            .take(TOP_DOMAINS)
            .map(|(d, _)| (*d).to_string())
            .collect(),
        signals: indicators
            .iter()
            .take(TOP_INDICATORS)
            .map(|(ind, count)| format!("{ind}: {count}x"))
            .collect(),
    }
}

fn aggregate_topics(topics: &[&str]) -> TopicInterests {
    let ranked: Vec<String> = tally(topics.iter().copied())
        .into_iter()
        .map(|(t, _)| t.to_string())
        .collect();

    TopicInterests {
        primary: ranked.iter().take(PRIMARY_TOPICS).cloned().collect(),
        secondary: ranked
            .iter()
            .skip(PRIMARY_TOPICS)
            .take(SECONDARY_TOPICS)
            .cloned()
            .collect(),
    }
}

fn interaction_stats(signals: &[Signal]) -> InteractionStats {
    let conversations: HashSet<Uuid> = signals.iter().filter_map(|s| s.conversation_id).collect();
    InteractionStats {
        total_conversations_analyzed: conversations.len(),
        total_signals: signals.len(),
    }
}

/// Count occurrences, most frequent first; ties keep first-seen order.
fn tally<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for item in items {
        match index.get(item) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(item, counts.len());
                counts.push((item, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
