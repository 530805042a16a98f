//! Process startup: build every collaborator from [`AppConfig`].

use livesent_core::AppConfig;

use crate::emotion::shared_classifier;
use crate::enrich::Enricher;
use crate::error::PipelineError;
use crate::inference::{shared_provider, InferenceProvider};
use crate::news::news_source_from_config;
use crate::service::QueryService;
use crate::store::store_from_config;

/// Build the query service, creating the store schema on the way.
///
/// Any failure here is fatal: a process that cannot reach its models or
/// store must not start serving.
///
/// # Errors
///
/// Returns the first [`PipelineError`] from provider selection, the embedding
/// dimension check, classifier connection, store schema setup or news client
/// construction.
pub async fn build_query_service(config: &AppConfig) -> Result<QueryService, PipelineError> {
    let store = store_from_config(config)?;
    store.ensure_schema().await?;
    tracing::info!(store = %config.store_backend, "event store ready");

    let provider = shared_provider(config).await?;
    check_embedding_dimension(provider.as_ref(), config.embedding_dim).await?;
    let classifier = shared_classifier(config).await?;
    let news = news_source_from_config(config)?;
    tracing::info!(
        provider = provider.name(),
        news = news.name(),
        "pipeline ready"
    );

    let enricher = Enricher::new(provider, classifier, store.clone(), config.enrich_concurrency)
        .with_embedding_dim(config.embedding_dim);
    Ok(QueryService::new(news, enricher, store, config.similar_k))
}

/// Embed a short text once and compare its length with the configured
/// dimension. A store holds vectors of one size only.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] when the provider produces no vector or
/// one of another size, and the provider's error if the call itself fails.
pub async fn check_embedding_dimension(
    provider: &dyn InferenceProvider,
    expected: usize,
) -> Result<(), PipelineError> {
    let vector = provider.embed("embedding dimension check").await?;
    if vector.is_empty() {
        return Err(PipelineError::Config(format!(
            "{} provider returned no embedding at startup",
            provider.name()
        )));
    }
    if vector.len() != expected {
        return Err(PipelineError::Config(format!(
            "{} provider produces {}-dimensional embeddings, \
             LIVESENT_EMBEDDING_DIM is {expected}",
            provider.name(),
            vector.len()
        )));
    }
    tracing::debug!(
        provider = provider.name(),
        dimension = expected,
        "embedding dimension verified"
    );
    Ok(())
}
