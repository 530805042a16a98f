//! Emotion classification over a hosted sequence-classification model.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use livesent_core::{AppConfig, Emotion};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::PipelineError;
use crate::inference::http_client;
use crate::normalize::normalize_default;

/// Classifier output for one text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionScore {
    pub emotion: Emotion,
    /// Probability of `emotion`, rounded to 4 decimal places.
    pub confidence: f64,
    /// Probability per model label, rounded to 4 decimal places.
    pub scores: BTreeMap<Emotion, f64>,
}

impl EmotionScore {
    /// The "no signal" result for blank input.
    #[must_use]
    pub fn neutral(labels: &[Emotion]) -> Self {
        let mut scores: BTreeMap<Emotion, f64> = labels.iter().map(|l| (*l, 0.0)).collect();
        scores.insert(Emotion::Neutral, 1.0);
        Self {
            emotion: Emotion::Neutral,
            confidence: 1.0,
            scores,
        }
    }
}

/// Model access: the label order and raw logits per text.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Labels in logit order.
    fn labels(&self) -> &[Emotion];

    /// One row of logits per input, aligned with [`labels`](Self::labels).
    async fn logits(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;
}

#[derive(Clone)]
pub struct EmotionClassifier {
    backend: Arc<dyn ClassifierBackend>,
}

impl EmotionClassifier {
    #[must_use]
    pub fn new(backend: Arc<dyn ClassifierBackend>) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn labels(&self) -> &[Emotion] {
        self.backend.labels()
    }

    /// Classify one text. Blank input (after normalization) is neutral.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Classifier`] when the model call fails or
    /// returns a malformed row.
    pub async fn classify(&self, text: &str) -> Result<EmotionScore, PipelineError> {
        let normalized = normalize_default(text);
        if normalized.is_empty() {
            return Ok(EmotionScore::neutral(self.labels()));
        }
        let rows = self.backend.logits(&[normalized]).await?;
        let row = rows
            .first()
            .ok_or_else(|| PipelineError::Classifier("model returned no rows".to_string()))?;
        self.score_row(row)
    }

    /// Classify many texts in one model call.
    ///
    /// Blank entries are sent as a single space to keep positions aligned and
    /// resolve to the same neutral result [`classify`](Self::classify) gives.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Classifier`] when the model call fails or the
    /// row count does not match the input.
    pub async fn classify_batch(&self, texts: &[String]) -> Result<Vec<EmotionScore>, PipelineError> {
        let normalized: Vec<String> = texts.iter().map(|t| normalize_default(t)).collect();
        if normalized.iter().all(String::is_empty) {
            return Ok(vec![EmotionScore::neutral(self.labels()); texts.len()]);
        }

        let padded: Vec<String> = normalized
            .iter()
            .map(|t| if t.is_empty() { " ".to_string() } else { t.clone() })
            .collect();
        let rows = self.backend.logits(&padded).await?;
        if rows.len() != texts.len() {
            return Err(PipelineError::Classifier(format!(
                "model returned {} rows for {} inputs",
                rows.len(),
                texts.len()
            )));
        }

        normalized
            .iter()
            .zip(rows.iter())
            .map(|(text, row)| {
                if text.is_empty() {
                    Ok(EmotionScore::neutral(self.labels()))
                } else {
                    self.score_row(row)
                }
            })
            .collect()
    }

    fn score_row(&self, logits: &[f32]) -> Result<EmotionScore, PipelineError> {
        let labels = self.labels();
        if logits.len() != labels.len() {
            return Err(PipelineError::Classifier(format!(
                "model returned {} logits for {} labels",
                logits.len(),
                labels.len()
            )));
        }

        let probs = softmax(logits);
        let mut top = 0;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[top] {
                top = i;
            }
        }

        let scores: BTreeMap<Emotion, f64> = labels
            .iter()
            .zip(probs.iter())
            .map(|(label, p)| (*label, round4(*p)))
            .collect();
        Ok(EmotionScore {
            emotion: labels[top],
            confidence: round4(probs[top]),
            scores,
        })
    }
}

fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .map(|l| f64::from(*l))
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (f64::from(*l) - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Classifier hosted by TEI (`/info` for labels, `/predict` for logits).
pub struct TeiClassifier {
    client: reqwest::Client,
    predict_url: String,
    labels: Vec<Emotion>,
}

#[derive(Deserialize)]
struct InfoResponse {
    model_type: ModelType,
}

#[derive(Deserialize)]
struct ModelType {
    classifier: ClassifierInfo,
}

#[derive(Deserialize)]
struct ClassifierInfo {
    id2label: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    inputs: Vec<[&'a str; 1]>,
    raw_scores: bool,
    truncate: bool,
}

#[derive(Deserialize)]
struct Prediction {
    score: f32,
    label: String,
}

impl TeiClassifier {
    /// Read the model's label map and return a ready client.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Classifier`] if `/info` cannot be fetched.
    /// - [`PipelineError::Config`] if the model is not a classifier or
    ///   reports a label outside the emotion set.
    pub async fn connect(base_url: &str, timeout_secs: u64) -> Result<Self, PipelineError> {
        let client = http_client(timeout_secs)?;
        let base_url = base_url.trim_end_matches('/');

        let response = client
            .get(format!("{base_url}/info"))
            .send()
            .await
            .map_err(|e| PipelineError::Classifier(format!("info request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(PipelineError::Classifier(format!(
                "info returned status {}",
                response.status()
            )));
        }
        let info: InfoResponse = response.json().await.map_err(|e| {
            PipelineError::Config(format!("classifier /info is not a classification model: {e}"))
        })?;

        let labels = parse_label_map(&info.model_type.classifier.id2label)?;
        tracing::info!(labels = labels.len(), "emotion classifier connected");

        Ok(Self {
            client,
            predict_url: format!("{base_url}/predict"),
            labels,
        })
    }
}

fn parse_label_map(id2label: &BTreeMap<String, String>) -> Result<Vec<Emotion>, PipelineError> {
    let mut indexed = Vec::with_capacity(id2label.len());
    for (id, label) in id2label {
        let index: usize = id
            .parse()
            .map_err(|_| PipelineError::Config(format!("non-numeric label id '{id}'")))?;
        let emotion = Emotion::from_label(label)
            .ok_or_else(|| PipelineError::Config(format!("unsupported emotion label '{label}'")))?;
        indexed.push((index, emotion));
    }
    indexed.sort_by_key(|(index, _)| *index);

    let labels: Vec<Emotion> = indexed.into_iter().map(|(_, e)| e).collect();
    let mut seen = labels.clone();
    seen.sort();
    seen.dedup();
    if seen.len() != labels.len() {
        return Err(PipelineError::Config("duplicate emotion labels".to_string()));
    }
    if labels.is_empty() {
        return Err(PipelineError::Config("classifier has no labels".to_string()));
    }
    Ok(labels)
}

#[async_trait]
impl ClassifierBackend for TeiClassifier {
    fn labels(&self) -> &[Emotion] {
        &self.labels
    }

    async fn logits(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let body = PredictRequest {
            inputs: texts.iter().map(|t| [t.as_str()]).collect(),
            raw_scores: true,
            truncate: true,
        };
        let response = self
            .client
            .post(&self.predict_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Classifier(format!("predict request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(PipelineError::Classifier(format!(
                "predict returned status {}",
                response.status()
            )));
        }
        let predictions: Vec<Vec<Prediction>> = response
            .json()
            .await
            .map_err(|e| PipelineError::Classifier(format!("predict response parse error: {e}")))?;

        predictions
            .into_iter()
            .map(|row| {
                let mut logits = vec![f32::NEG_INFINITY; self.labels.len()];
                for prediction in row {
                    let position = Emotion::from_label(&prediction.label)
                        .and_then(|e| self.labels.iter().position(|l| *l == e))
                        .ok_or_else(|| {
                            PipelineError::Classifier(format!(
                                "unexpected label '{}'",
                                prediction.label
                            ))
                        })?;
                    logits[position] = prediction.score;
                }
                if logits.iter().any(|l| l.is_infinite()) {
                    return Err(PipelineError::Classifier(
                        "prediction is missing labels".to_string(),
                    ));
                }
                Ok(logits)
            })
            .collect()
    }
}

static SHARED_CLASSIFIER: OnceCell<EmotionClassifier> = OnceCell::const_new();

/// Process-wide classifier, connected on first use.
///
/// # Errors
///
/// Propagates [`TeiClassifier::connect`] failures; callers treat them as
/// fatal at startup.
pub async fn shared_classifier(config: &AppConfig) -> Result<EmotionClassifier, PipelineError> {
    SHARED_CLASSIFIER
        .get_or_try_init(|| async {
            let backend =
                TeiClassifier::connect(&config.tei_classifier_url, config.inference_timeout_secs)
                    .await?;
            Ok::<_, PipelineError>(EmotionClassifier::new(Arc::new(backend)))
        })
        .await
        .cloned()
}

#[cfg(test)]
#[path = "emotion_test.rs"]
mod tests;
