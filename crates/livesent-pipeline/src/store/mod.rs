//! Content-addressed event storage with location-filtered vector search.

mod memory;
mod qdrant;

use std::sync::Arc;

use async_trait::async_trait;
use livesent_core::{AppConfig, EnrichedEvent, SimilarityResult, StoreBackend};

use crate::error::PipelineError;

pub use memory::MemoryStore;
pub use qdrant::{identity_to_point_id, QdrantStore};

/// Candidates fetched from the vector index before location filtering.
pub const NUM_CANDIDATES: usize = 100;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Store `event` unless its identity already exists.
    ///
    /// Returns `true` for a new record and `false` for a duplicate, including
    /// one currently being written by another task.
    async fn insert(&self, event: &EnrichedEvent) -> Result<bool, PipelineError>;

    /// Nearest stored events whose location contains `location_filter`
    /// (case-insensitive), newest first.
    ///
    /// An empty `vector`, a missing collection, or no vectors of matching
    /// dimension yield an empty list.
    async fn similarity_search(
        &self,
        vector: &[f32],
        location_filter: &str,
        k: usize,
    ) -> Result<Vec<SimilarityResult>, PipelineError>;

    async fn health_check(&self) -> Result<(), PipelineError>;

    /// Create collections and indexes. No-op for stores without a schema.
    async fn ensure_schema(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Build the store named by the config.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] if an HTTP client cannot be built.
pub fn store_from_config(config: &AppConfig) -> Result<Arc<dyn EventStore>, PipelineError> {
    let store: Arc<dyn EventStore> = match config.store_backend {
        StoreBackend::Qdrant => Arc::new(QdrantStore::new(
            &config.qdrant_url,
            &config.qdrant_collection,
            config.embedding_dim,
            config.store_timeout_secs,
        )?),
        StoreBackend::Memory => Arc::new(MemoryStore::with_dimension(config.embedding_dim)),
    };
    Ok(store)
}

/// Case-insensitive substring match used by every backend.
pub(crate) fn location_matches(location: &str, filter: &str) -> bool {
    location.to_lowercase().contains(&filter.to_lowercase())
}

/// Newest first. Timestamps are ISO-8601 strings, so lexical order is
/// chronological for a consistent format.
pub(crate) fn sort_newest_first(results: &mut [SimilarityResult]) {
    results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
