//! Per-article enrichment: summarize, classify, embed, store.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use livesent_core::{Article, EnrichedEvent};

use crate::emotion::EmotionClassifier;
use crate::error::PipelineError;
use crate::inference::InferenceProvider;
use crate::store::EventStore;

/// What happened to one input article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    /// Enriched and written as a new record.
    Stored,
    /// Enriched; the identity was already recorded.
    Duplicate,
    /// Enriched without an embedding, so it was reported but not stored.
    NotEmbedded,
    /// Skipped after a failure in `stage`.
    Failed { stage: Stage, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Summarize,
    Classify,
    Embed,
    Insert,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Summarize => write!(f, "summarize"),
            Stage::Classify => write!(f, "classify"),
            Stage::Embed => write!(f, "embed"),
            Stage::Insert => write!(f, "insert"),
        }
    }
}

/// Result of enriching one batch of articles.
#[derive(Debug, Default)]
pub struct EnrichmentReport {
    /// Enriched events in input order, failed articles omitted.
    pub events: Vec<EnrichedEvent>,
    /// One outcome per input article, in input order.
    pub outcomes: Vec<ArticleOutcome>,
    /// First connectivity failure returned by the store.
    store_error: Option<PipelineError>,
}

impl EnrichmentReport {
    #[must_use]
    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, ArticleOutcome::Stored))
    }

    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.count(|o| matches!(o, ArticleOutcome::Duplicate))
    }

    /// Inserts that completed without error, new or duplicate.
    #[must_use]
    pub fn insert_attempts(&self) -> usize {
        self.inserted() + self.duplicates()
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.count(|o| matches!(o, ArticleOutcome::Failed { .. }))
    }

    /// Embedding of the first event that has one; the similarity query vector.
    #[must_use]
    pub fn first_embedding(&self) -> Option<&[f32]> {
        self.events
            .iter()
            .find(|e| e.has_embedding())
            .map(|e| e.embedding.as_slice())
    }

    /// The store outage behind this batch, if no insert reached the store.
    ///
    /// One failed insert next to a successful one stays a per-article skip;
    /// when every attempt failed the store is down and the request must fail.
    pub fn take_store_failure(&mut self) -> Option<PipelineError> {
        if self.insert_attempts() > 0 {
            return None;
        }
        self.store_error.take()
    }

    fn count(&self, pred: impl Fn(&ArticleOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

type StageResult<T> = Result<T, (Stage, PipelineError)>;

/// Runs the enrichment chain with a bounded per-request fan-out.
#[derive(Clone)]
pub struct Enricher {
    provider: Arc<dyn InferenceProvider>,
    classifier: EmotionClassifier,
    store: Arc<dyn EventStore>,
    concurrency: usize,
    embedding_dim: Option<usize>,
}

impl Enricher {
    #[must_use]
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        classifier: EmotionClassifier,
        store: Arc<dyn EventStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            provider,
            classifier,
            store,
            concurrency: concurrency.max(1),
            embedding_dim: None,
        }
    }

    /// Reject embeddings whose length differs from `dim` instead of storing them.
    #[must_use]
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = Some(dim);
        self
    }

    /// Enrich `articles` for one query.
    ///
    /// Summarize, classify and embed run concurrently; inserts then run one at
    /// a time in input order, so the first article claims a shared identity.
    /// Each article's failure is logged and recorded in the report.
    pub async fn enrich(
        &self,
        articles: &[Article],
        location: &str,
        timestamp: &str,
    ) -> EnrichmentReport {
        let prepared: Vec<StageResult<EnrichedEvent>> = stream::iter(0..articles.len())
            .map(|i| self.prepare(&articles[i], location, timestamp))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = EnrichmentReport::default();
        for (article, result) in articles.iter().zip(prepared) {
            let result = match result {
                Ok(event) => self.store_event(event).await,
                Err(failure) => Err(failure),
            };
            match result {
                Ok((event, outcome)) => {
                    report.events.push(event);
                    report.outcomes.push(outcome);
                }
                Err((stage, e)) => {
                    tracing::warn!(
                        location,
                        article = %article.title,
                        stage = %stage,
                        error = %e,
                        "skipping article"
                    );
                    report.outcomes.push(ArticleOutcome::Failed {
                        stage,
                        error: e.to_string(),
                    });
                    if stage == Stage::Insert
                        && e.is_store_unavailable()
                        && report.store_error.is_none()
                    {
                        report.store_error = Some(e);
                    }
                }
            }
        }

        tracing::info!(
            location,
            articles = articles.len(),
            inserted = report.inserted(),
            duplicates = report.duplicates(),
            failed = report.failures(),
            "enrichment finished"
        );
        report
    }

    async fn prepare(
        &self,
        article: &Article,
        location: &str,
        timestamp: &str,
    ) -> StageResult<EnrichedEvent> {
        let summary = self
            .provider
            .summarize(&article.combined_text())
            .await
            .map_err(|e| (Stage::Summarize, e))?;
        let emotion = self
            .classifier
            .classify(&summary)
            .await
            .map_err(|e| (Stage::Classify, e))?;
        let embedding = self
            .provider
            .embed(&summary)
            .await
            .map_err(|e| (Stage::Embed, e))?;

        Ok(EnrichedEvent::new(
            location,
            timestamp,
            article.title.clone(),
            article.snippet.clone(),
            summary,
            emotion.emotion,
            embedding,
            article.link.clone(),
        ))
    }

    async fn store_event(
        &self,
        event: EnrichedEvent,
    ) -> StageResult<(EnrichedEvent, ArticleOutcome)> {
        if !event.has_embedding() {
            tracing::warn!(
                location = %event.location,
                article = %event.raw_title,
                "no embedding produced, event will not be stored"
            );
            return Ok((event, ArticleOutcome::NotEmbedded));
        }

        if let Some(expected) = self.embedding_dim {
            if event.embedding.len() != expected {
                return Err((
                    Stage::Embed,
                    PipelineError::Config(format!(
                        "embedding has {} dimensions, expected {expected}",
                        event.embedding.len()
                    )),
                ));
            }
        }

        let outcome = if self
            .store
            .insert(&event)
            .await
            .map_err(|e| (Stage::Insert, e))?
        {
            ArticleOutcome::Stored
        } else {
            tracing::debug!(id = %event.id, "event already recorded");
            ArticleOutcome::Duplicate
        };
        Ok((event, outcome))
    }
}
