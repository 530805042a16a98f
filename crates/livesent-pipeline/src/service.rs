//! End-to-end handling of one location query.

use std::sync::Arc;

use chrono::Utc;
use livesent_core::{location_filter, LocationQuery};

use crate::aggregate::{aggregate, AggregatedResponse};
use crate::enrich::Enricher;
use crate::error::PipelineError;
use crate::news::NewsSource;
use crate::store::EventStore;

/// Fetch → enrich → one similarity search → aggregate.
#[derive(Clone)]
pub struct QueryService {
    news: Arc<dyn NewsSource>,
    enricher: Enricher,
    store: Arc<dyn EventStore>,
    similar_k: usize,
}

impl QueryService {
    #[must_use]
    pub fn new(
        news: Arc<dyn NewsSource>,
        enricher: Enricher,
        store: Arc<dyn EventStore>,
        similar_k: usize,
    ) -> Self {
        Self {
            news,
            enricher,
            store,
            similar_k,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Run a location query.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidQuery`] for malformed input.
    /// - [`PipelineError::NoData`] when the news source finds nothing.
    /// - Upstream errors from the news source.
    /// - Store errors from the similarity search, or from inserts when no
    ///   article could be written.
    ///
    /// Per-article enrichment failures are not errors; those articles are
    /// left out of the response.
    pub async fn run(&self, query: &LocationQuery) -> Result<AggregatedResponse, PipelineError> {
        query.validate()?;
        let location = query.location.as_str();
        let timestamp = query.resolve_timestamp(Utc::now());

        let articles = self.news.fetch_news(location).await?;
        if articles.is_empty() {
            tracing::info!(location, source = self.news.name(), "no news found");
            return Err(PipelineError::NoData {
                location: location.to_string(),
            });
        }
        tracing::debug!(location, count = articles.len(), "fetched articles");

        let mut report = self.enricher.enrich(&articles, location, &timestamp).await;
        if let Some(e) = report.take_store_failure() {
            tracing::error!(location, error = %e, "event store unavailable");
            return Err(e);
        }

        let similar = match report.first_embedding() {
            Some(vector) => {
                self.store
                    .similarity_search(vector, location_filter(location), self.similar_k)
                    .await?
            }
            None => {
                tracing::warn!(location, "no embedded events, skipping similarity search");
                Vec::new()
            }
        };

        Ok(aggregate(&report.events, location, similar))
    }
}
