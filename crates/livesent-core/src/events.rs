use serde::{Deserialize, Serialize};

/// A news listing as returned by a news source. Consumed once by enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    /// Snippet or description. Empty when the source has none.
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl Article {
    /// Text handed to the summarizer: `"{title}. {snippet}"`.
    #[must_use]
    pub fn combined_text(&self) -> String {
        format!("{}. {}", self.title, self.snippet)
    }
}

/// The fixed emotion label set. `Neutral` is reserved for "no signal".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Disgust,
    Fear,
    Joy,
    Sadness,
    Surprise,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Anger,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Joy,
        Emotion::Sadness,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Anger => "anger",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Parse a model label, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(label))
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An article after summarization, classification and embedding.
///
/// Immutable once stored. `embedding` is empty when the embedding provider
/// signalled "no embedding"; such events are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    pub id: String,
    pub location: String,
    pub raw_title: String,
    pub raw_description: String,
    pub summary: String,
    pub sentiment: Emotion,
    pub embedding: Vec<f32>,
    pub source_url: String,
    pub timestamp: String,
}

impl EnrichedEvent {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        location: &str,
        timestamp: &str,
        raw_title: String,
        raw_description: String,
        summary: String,
        sentiment: Emotion,
        embedding: Vec<f32>,
        source_url: String,
    ) -> Self {
        Self {
            id: event_identity(location, timestamp),
            location: location.to_string(),
            raw_title,
            raw_description,
            summary,
            sentiment,
            embedding,
            source_url,
            timestamp: timestamp.to_string(),
        }
    }

    #[must_use]
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }

    #[must_use]
    pub fn to_similarity_result(&self) -> SimilarityResult {
        SimilarityResult {
            summary: self.summary.clone(),
            sentiment: self.sentiment,
            timestamp: self.timestamp.clone(),
            raw_title: self.raw_title.clone(),
            source_url: self.source_url.clone(),
        }
    }
}

/// Projection of a stored event returned by similarity search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub summary: String,
    pub sentiment: Emotion,
    pub timestamp: String,
    pub raw_title: String,
    pub source_url: String,
}

/// Deduplication identity of a stored event: `"<location>_<timestamp>"`.
///
/// Inputs are used verbatim (no trimming or case folding) so identities stay
/// compatible with previously stored records. Two events with the same
/// location and timestamp collide; the store keeps the first one.
#[must_use]
pub fn event_identity(location: &str, timestamp: &str) -> String {
    format!("{location}_{timestamp}")
}

/// Location filter used for similarity search: the leading place name.
///
/// `"Nairobi, Kenya"` filters on `"Nairobi"`, which matches any stored
/// location containing it regardless of case or the trailing qualifiers.
#[must_use]
pub fn location_filter(location: &str) -> &str {
    let trimmed = location.trim();
    match trimmed.split(',').next().map(str::trim) {
        Some(head) if !head.is_empty() => head,
        _ => trimmed,
    }
}
