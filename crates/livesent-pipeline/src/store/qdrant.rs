//! Qdrant vector store client for event deduplication and similarity search.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use livesent_core::{Emotion, EnrichedEvent, SimilarityResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{location_matches, sort_newest_first, EventStore, NUM_CANDIDATES};
use crate::error::PipelineError;
use crate::inference::http_client;

/// Payload fields indexed for filtering.
const INDEXED_FIELDS: [&str; 2] = ["location", "timestamp"];

/// Qdrant HTTP client.
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    dimension: usize,
    /// Point ids with a check-then-write in progress in this process.
    in_flight: Mutex<HashSet<u64>>,
}

#[derive(Serialize)]
struct CreateCollectionRequest {
    vectors: VectorsConfig,
}

#[derive(Serialize, Deserialize)]
struct VectorsConfig {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    field_name: &'a str,
    field_schema: &'a str,
}

#[derive(Serialize)]
struct UpsertPointsRequest<'a> {
    points: [Point<'a>; 1],
    /// Existing points are replaced only when they match this filter.
    update_filter: serde_json::Value,
}

#[derive(Serialize)]
struct Point<'a> {
    id: u64,
    vector: &'a [f32],
    payload: EventPayload,
}

/// Everything stored alongside the vector.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct EventPayload {
    id: String,
    location: String,
    raw_title: String,
    #[serde(default)]
    raw_description: String,
    summary: String,
    sentiment: Emotion,
    #[serde(default)]
    source_url: String,
    timestamp: String,
}

impl EventPayload {
    fn from_event(event: &EnrichedEvent) -> Self {
        Self {
            id: event.id.clone(),
            location: event.location.clone(),
            raw_title: event.raw_title.clone(),
            raw_description: event.raw_description.clone(),
            summary: event.summary.clone(),
            sentiment: event.sentiment,
            source_url: event.source_url.clone(),
            timestamp: event.timestamp.clone(),
        }
    }
}

#[derive(Serialize)]
struct RetrieveRequest {
    ids: [u64; 1],
    with_payload: bool,
    with_vector: bool,
}

#[derive(Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    result: Vec<RetrievedPoint>,
}

#[derive(Deserialize)]
struct RetrievedPoint {
    #[serde(default)]
    payload: Option<EventPayload>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    result: CollectionInfo,
}

#[derive(Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: VectorsConfig,
}

/// Releases an in-flight claim even if the insert future is dropped.
struct InFlightClaim<'a> {
    set: &'a Mutex<HashSet<u64>>,
    id: u64,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl QdrantStore {
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be built.
    pub fn new(
        qdrant_url: &str,
        collection: &str,
        dimension: usize,
        timeout_secs: u64,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: qdrant_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            dimension,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn claim(&self, id: u64) -> Option<InFlightClaim<'_>> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        set.insert(id).then(|| InFlightClaim {
            set: &self.in_flight,
            id,
        })
    }

    async fn point_exists(&self, point_id: u64) -> Result<bool, PipelineError> {
        let url = format!("{}/points/{point_id}", self.collection_url());
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::Qdrant(format!("point check request failed: {e}")))?;

        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(PipelineError::Qdrant(format!("point check returned status {s}"))),
        }
    }

    /// Write `event` unless a point with its id already exists.
    ///
    /// Every stored payload carries a non-empty `id`, so the `is_empty`
    /// filter never matches an existing point and Qdrant leaves it untouched.
    async fn insert_only(
        &self,
        point_id: u64,
        event: &EnrichedEvent,
    ) -> Result<(), PipelineError> {
        let body = UpsertPointsRequest {
            points: [Point {
                id: point_id,
                vector: &event.embedding,
                payload: EventPayload::from_event(event),
            }],
            update_filter: serde_json::json!({
                "must": [{ "is_empty": { "key": "id" } }]
            }),
        };

        let url = format!("{}/points?wait=true", self.collection_url());
        let resp = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Qdrant(format!("upsert request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(PipelineError::Qdrant(format!(
                "upsert returned status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn stored_payload(&self, point_id: u64) -> Result<Option<EventPayload>, PipelineError> {
        let url = format!("{}/points", self.collection_url());
        let resp = self
            .client
            .post(&url)
            .json(&RetrieveRequest {
                ids: [point_id],
                with_payload: true,
                with_vector: false,
            })
            .send()
            .await
            .map_err(|e| PipelineError::Qdrant(format!("point read request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(PipelineError::Qdrant(format!(
                "point read returned status {}",
                resp.status()
            )));
        }
        let body: RetrieveResponse = resp
            .json()
            .await
            .map_err(|e| PipelineError::Qdrant(format!("point read parse error: {e}")))?;
        Ok(body.result.into_iter().next().and_then(|p| p.payload))
    }

    async fn create_collection(&self) -> Result<(), PipelineError> {
        let body = CreateCollectionRequest {
            vectors: VectorsConfig {
                size: self.dimension,
                distance: "Cosine".to_string(),
            },
        };
        let resp = self
            .client
            .put(self.collection_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Qdrant(format!("collection create request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(PipelineError::Qdrant(format!(
                "collection create returned status {}",
                resp.status()
            )));
        }
        tracing::info!(
            collection = %self.collection,
            dimension = self.dimension,
            "created Qdrant collection"
        );
        Ok(())
    }

    async fn create_index(&self, field: &str) -> Result<(), PipelineError> {
        let url = format!("{}/index?wait=true", self.collection_url());
        let resp = self
            .client
            .put(&url)
            .json(&CreateIndexRequest {
                field_name: field,
                field_schema: "keyword",
            })
            .send()
            .await
            .map_err(|e| PipelineError::Qdrant(format!("index create request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(PipelineError::Qdrant(format!(
                "index create for '{field}' returned status {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for QdrantStore {
    /// Check, write insert-only, then read back.
    ///
    /// The read-back decides the result: another process may have written
    /// the same identity between the check and the write, and its payload
    /// then stays in place.
    async fn insert(&self, event: &EnrichedEvent) -> Result<bool, PipelineError> {
        if event.embedding.len() != self.dimension {
            return Err(PipelineError::Config(format!(
                "event vector has {} dimensions, collection '{}' expects {}",
                event.embedding.len(),
                self.collection,
                self.dimension
            )));
        }

        let point_id = identity_to_point_id(&event.id);
        let Some(_claim) = self.claim(point_id) else {
            tracing::debug!(id = %event.id, "event insert already in flight");
            return Ok(false);
        };

        if self.point_exists(point_id).await? {
            tracing::debug!(id = %event.id, "event already recorded");
            return Ok(false);
        }
        self.insert_only(point_id, event).await?;

        match self.stored_payload(point_id).await? {
            Some(stored) if stored == EventPayload::from_event(event) => Ok(true),
            Some(_) => {
                tracing::debug!(id = %event.id, "event recorded concurrently by another writer");
                Ok(false)
            }
            None => Err(PipelineError::Qdrant(format!(
                "point for '{}' missing after write",
                event.id
            ))),
        }
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

        let url = format!("{}/points/search", self.collection_url());
        let resp = self
            .client
            .post(&url)
            .json(&SearchRequest {
                vector,
                limit: NUM_CANDIDATES,
                with_payload: true,
            })
            .send()
            .await
            .map_err(|e| PipelineError::Qdrant(format!("search request failed: {e}")))?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                tracing::warn!(collection = %self.collection, "collection missing, no similar events");
                return Ok(Vec::new());
            }
            StatusCode::BAD_REQUEST => {
                let body = resp.text().await.unwrap_or_default();
                if body.to_lowercase().contains("dimension") {
                    tracing::warn!(
                        dimension = vector.len(),
                        "search vector dimension does not match the collection"
                    );
                    return Ok(Vec::new());
                }
                tracing::error!(collection = %self.collection, body = %body, "search rejected");
                return Err(PipelineError::Qdrant(format!("search rejected: {body}")));
            }
            s => {
                return Err(PipelineError::Qdrant(format!(
                    "search returned status {s}"
                )))
            }
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| PipelineError::Qdrant(format!("search response parse error: {e}")))?;

        let mut results: Vec<SimilarityResult> = body
            .result
            .into_iter()
            .filter_map(|point| {
                let payload = point.payload?;
                match serde_json::from_value::<EventPayload>(payload) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping point with unreadable payload");
                        None
                    }
                }
            })
            .filter(|p| location_matches(&p.location, location_filter))
            .take(k)
            .map(|p| SimilarityResult {
                summary: p.summary,
                sentiment: p.sentiment,
                timestamp: p.timestamp,
                raw_title: p.raw_title,
                source_url: p.source_url,
            })
            .collect();
        sort_newest_first(&mut results);
        Ok(results)
    }

    async fn health_check(&self) -> Result<(), PipelineError> {
        let resp = self
            .client
            .get(format!("{}/healthz", self.base_url))
            .send()
            .await
            .map_err(|e| PipelineError::Qdrant(format!("health request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(PipelineError::Qdrant(format!(
                "health check returned status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// Ensure the collection exists with the configured dimension, then
    /// ensure the payload indexes.
    async fn ensure_schema(&self) -> Result<(), PipelineError> {
        let resp = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(|e| PipelineError::Qdrant(format!("collection check request failed: {e}")))?;

        match resp.status() {
            s if s.is_success() => {
                let info: CollectionResponse = resp.json().await.map_err(|e| {
                    PipelineError::Qdrant(format!("collection info parse error: {e}"))
                })?;
                let existing = info.result.config.params.vectors.size;
                if existing != self.dimension {
                    return Err(PipelineError::Config(format!(
                        "collection '{}' stores {existing}-dimensional vectors but the \
                         configured dimension is {}",
                        self.collection, self.dimension
                    )));
                }
            }
            StatusCode::NOT_FOUND => self.create_collection().await?,
            s => {
                return Err(PipelineError::Qdrant(format!(
                    "collection check returned status {s}"
                )))
            }
        }

        for field in INDEXED_FIELDS {
            self.create_index(field).await?;
        }
        Ok(())
    }
}

/// Derive a stable Qdrant point ID (u64) from an event identity.
///
/// Takes the first 8 bytes of SHA-256(identity) and interprets them as a
/// big-endian u64. The same identity always produces the same ID.
#[must_use]
pub fn identity_to_point_id(identity: &str) -> u64 {
    let hash = Sha256::digest(identity.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[..8]);
    u64::from_be_bytes(bytes)
}
