//! Emotion statistics and the final query response.

use chrono::{DateTime, Utc};
use livesent_core::{Emotion, EnrichedEvent, SimilarityResult};
use serde::{Deserialize, Serialize};

/// Per-article view in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: String,
    pub summary: String,
    pub sentiment: Emotion,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResponse {
    pub location: String,
    /// Generation time, `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
    pub timestamp: String,
    pub dominant_mood: Emotion,
    pub summary_insight: String,
    pub total_articles: usize,
    pub articles: Vec<ArticleSummary>,
    pub similar_past: Vec<SimilarityResult>,
}

/// Build the response for `location` at the current wall-clock time.
#[must_use]
pub fn aggregate(
    events: &[EnrichedEvent],
    location: &str,
    similar: Vec<SimilarityResult>,
) -> AggregatedResponse {
    aggregate_at(events, location, similar, Utc::now())
}

/// [`aggregate`] with an explicit generation time.
#[must_use]
pub fn aggregate_at(
    events: &[EnrichedEvent],
    location: &str,
    similar: Vec<SimilarityResult>,
    now: DateTime<Utc>,
) -> AggregatedResponse {
    let (dominant_mood, summary_insight) = match dominant(events) {
        Some((mood, count)) => {
            #[allow(clippy::cast_precision_loss)]
            let pct = count as f64 / events.len() as f64 * 100.0;
            (
                mood,
                format!("The prevailing mood in {location} is '{mood}' ({pct:.1}% of articles)."),
            )
        }
        None => (
            Emotion::Neutral,
            format!("No strong emotional signals detected in recent news for {location}."),
        ),
    };

    AggregatedResponse {
        location: title_case(location),
        timestamp: now.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
        dominant_mood,
        summary_insight,
        total_articles: events.len(),
        articles: events
            .iter()
            .map(|e| ArticleSummary {
                title: e.raw_title.clone(),
                summary: e.summary.clone(),
                sentiment: e.sentiment,
                source: e.source_url.clone(),
            })
            .collect(),
        similar_past: similar,
    }
}

/// Most frequent sentiment and its count. Ties go to the label seen first.
fn dominant(events: &[EnrichedEvent]) -> Option<(Emotion, usize)> {
    let mut counts: Vec<(Emotion, usize)> = Vec::new();
    for event in events {
        match counts.iter_mut().find(|(e, _)| *e == event.sentiment) {
            Some((_, n)) => *n += 1,
            None => counts.push((event.sentiment, 1)),
        }
    }

    let mut best: Option<(Emotion, usize)> = None;
    for (emotion, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((emotion, n));
        }
    }
    best
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}
