//! In-process store for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use livesent_core::{EnrichedEvent, SimilarityResult};
use tokio::sync::RwLock;

use super::{location_matches, sort_newest_first, EventStore, NUM_CANDIDATES};
use crate::error::PipelineError;

#[derive(Default)]
pub struct MemoryStore {
    events: RwLock<HashMap<String, EnrichedEvent>>,
    dimension: Option<usize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that only accepts vectors of length `dimension`.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            events: RwLock::default(),
            dimension: Some(dimension),
        }
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    pub async fn get(&self, id: &str) -> Option<EnrichedEvent> {
        self.events.read().await.get(id).cloned()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert(&self, event: &EnrichedEvent) -> Result<bool, PipelineError> {
        if let Some(dimension) = self.dimension {
            if event.embedding.len() != dimension {
                return Err(PipelineError::Config(format!(
                    "event vector has {} dimensions, store expects {dimension}",
                    event.embedding.len()
                )));
            }
        }
        let mut events = self.events.write().await;
        if events.contains_key(&event.id) {
            tracing::debug!(id = %event.id, "event already recorded");
            return Ok(false);
        }
        events.insert(event.id.clone(), event.clone());
        Ok(true)
    }

    async fn similarity_search(
        &self,
        vector: &[f32],
        location_filter: &str,
        k: usize,
    ) -> Result<Vec<SimilarityResult>, PipelineError> {
        if vector.is_empty() {
            return Ok(Vec::new());
        }

        let events = self.events.read().await;
        let mut scored: Vec<(f32, &EnrichedEvent)> = events
            .values()
            .filter(|e| e.embedding.len() == vector.len())
            .map(|e| (cosine_similarity(vector, &e.embedding), e))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut results: Vec<SimilarityResult> = scored
            .into_iter()
            .take(NUM_CANDIDATES)
            .filter(|(_, e)| location_matches(&e.location, location_filter))
            .take(k)
            .map(|(_, e)| e.to_similarity_result())
            .collect();
        sort_newest_first(&mut results);
        Ok(results)
    }

    async fn health_check(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use livesent_core::Emotion;

    use super::*;

    fn event(location: &str, timestamp: &str, embedding: Vec<f32>) -> EnrichedEvent {
        EnrichedEvent::new(
            location,
            timestamp,
            format!("{location} headline"),
            "description".to_string(),
            format!("{location} summary"),
            Emotion::Joy,
            embedding,
            "https://example.com".to_string(),
        )
    }

    #[tokio::test]
    async fn duplicate_insert_returns_false_and_keeps_first() {
        let store = MemoryStore::new();
        let first = event("Nairobi, Kenya", "2025-06-11T14:22:00Z", vec![1.0, 0.0]);
        let mut second = first.clone();
        second.summary = "different".to_string();

        assert!(store.insert(&first).await.unwrap());
        assert!(!store.insert(&second).await.unwrap());
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get(&first.id).await.unwrap().summary,
            "Nairobi, Kenya summary"
        );
    }

    #[tokio::test]
    async fn concurrent_inserts_of_one_identity_store_once() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let ev = event("Lagos", "2025-06-11", vec![1.0]);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let ev = ev.clone();
                tokio::spawn(async move { store.insert(&ev).await.unwrap() })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn search_filters_by_location_and_orders_newest_first() {
        let store = MemoryStore::new();
        store.insert(&event("Nairobi, Kenya", "2025-06-01", vec![1.0, 0.0])).await.unwrap();
        store.insert(&event("nairobi", "2025-06-05", vec![0.9, 0.1])).await.unwrap();
        store.insert(&event("Mombasa, Kenya", "2025-06-06", vec![1.0, 0.0])).await.unwrap();

        let results = store.similarity_search(&[1.0, 0.0], "Nairobi", 5).await.unwrap();
        let stamps: Vec<&str> = results.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(stamps, ["2025-06-05", "2025-06-01"]);
    }

    #[tokio::test]
    async fn search_keeps_the_k_nearest_before_sorting() {
        let store = MemoryStore::new();
        store.insert(&event("Delhi", "2025-06-01", vec![1.0, 0.0])).await.unwrap();
        store.insert(&event("Delhi", "2025-06-02", vec![0.0, 1.0])).await.unwrap();
        store.insert(&event("Delhi", "2025-06-03", vec![0.8, 0.2])).await.unwrap();

        let results = store.similarity_search(&[1.0, 0.0], "delhi", 2).await.unwrap();
        let stamps: Vec<&str> = results.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(stamps, ["2025-06-03", "2025-06-01"]);
    }

    #[tokio::test]
    async fn empty_vector_or_dimension_mismatch_returns_nothing() {
        let store = MemoryStore::new();
        store.insert(&event("Delhi", "2025-06-01", vec![1.0, 0.0])).await.unwrap();

        assert!(store.similarity_search(&[], "Delhi", 5).await.unwrap().is_empty());
        assert!(store
            .similarity_search(&[1.0, 0.0, 0.0], "Delhi", 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn sized_store_rejects_vectors_of_another_dimension() {
        let store = MemoryStore::with_dimension(2);
        assert!(store.insert(&event("Delhi", "2025-06-01", vec![1.0, 0.0])).await.unwrap());

        let err = store
            .insert(&event("Delhi", "2025-06-02", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(!err.is_store_unavailable());
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
