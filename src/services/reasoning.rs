//! Human-readable justification of a computed score.

use crate::domain::models::ScoreComponent;

/// Components quoted in the reasoning text.
const QUOTED_COMPONENTS: usize = 3;

/// Qualitative band of a 0-100 score.
pub fn score_level(score: f64) -> &'static str {
    if score >= 80.0 {
        "high"
    } else if score >= 60.0 {
        "moderate-high"
    } else if score >= 40.0 {
        "moderate"
    } else if score >= 20.0 {
        "moderate-low"
    } else {
        "low"
    }
}

/// Reasoning used when a dimension had no signals to work with.
pub fn default_reasoning(dimension: &str) -> String {
    format!("Default score: no signals available for {dimension}")
}

/// Level sentence, delta sentence (only for changes of at least one point)
/// and the heaviest contributing components.
pub fn generate_reasoning(
    label: &str,
    score: f64,
    previous: Option<f64>,
    components: &[ScoreComponent],
) -> String {
    let mut parts = vec![format!("{label} is {} at {score:.0}/100.", score_level(score))];

    if let Some(previous) = previous {
        let delta = score - previous;
        if delta.abs() >= 1.0 {
            let direction = if delta > 0.0 { "increased" } else { "decreased" };
            parts.push(format!(
                "Score {direction} from {previous:.0} → {score:.0} (Δ{delta:+.0})."
            ));
        }
    }

    if !components.is_empty() {
        let mut ranked: Vec<&ScoreComponent> = components.iter().collect();
        ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        let quoted: Vec<String> = ranked
            .iter()
            .take(QUOTED_COMPONENTS)
            .map(|c| {
                format!(
                    "{}={:.0} ({:.0}d ago)",
                    c.key.replace('.', ": ").replace('_', " "),
                    c.value,
                    c.days_ago
                )
            })
            .collect();
        parts.push(format!("Key signals: {}.", quoted.join("; ")));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn component(key: &str, value: f64, weight: f64, days_ago: f64) -> ScoreComponent {
        ScoreComponent {
            signal_id: Uuid::nil(),
            key: key.to_string(),
            value,
            weight,
            days_ago,
        }
    }

    #[test]
    fn test_score_levels() {
        assert_eq!(score_level(95.0), "high");
        assert_eq!(score_level(80.0), "high");
        assert_eq!(score_level(79.9), "moderate-high");
        assert_eq!(score_level(40.0), "moderate");
        assert_eq!(score_level(20.0), "moderate-low");
        assert_eq!(score_level(3.0), "low");
    }

    #[test]
    fn test_reasoning_with_delta_and_components() {
        let components = vec![
            component("temperament.score_inverted", 30.0, 0.1, 2.0),
            component("sentiment.overall_inverted", 75.0, 0.3, 1.0),
            component("sentiment.frustration_detected", 100.0, 0.2, 4.0),
            component("temperament.score_inverted", 10.0, 0.05, 9.0),
        ];
        let text = generate_reasoning("Escalation risk", 65.0, Some(50.0), &components);
        assert_eq!(
            text,
            "Escalation risk is moderate-high at 65/100. Score increased from 50 → 65 (Δ+15). \
             Key signals: sentiment: overall inverted=75 (1d ago); \
             sentiment: frustration detected=100 (4d ago); temperament: score inverted=30 (2d ago)."
        );
    }

    #[test]
    fn test_small_delta_is_not_mentioned() {
        let text = generate_reasoning("Responsiveness", 50.4, Some(50.0), &[]);
        assert_eq!(text, "Responsiveness is moderate at 50/100.");

        let text = generate_reasoning("Responsiveness", 40.0, Some(52.0), &[]);
        assert!(text.ends_with("Score decreased from 52 → 40 (Δ-12)."));
    }
}
