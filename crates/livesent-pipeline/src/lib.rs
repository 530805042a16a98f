//! Location news sentiment pipeline.
//!
//! Fetches recent news for a location, summarizes each article, classifies
//! its emotion, embeds the summary, stores the event under a deterministic
//! identity, and answers with an aggregated mood plus similar past events
//! for the same place.

pub mod aggregate;
pub mod bootstrap;
pub mod emotion;
pub mod enrich;
pub mod error;
pub mod inference;
pub mod news;
pub mod normalize;
pub mod service;
pub mod store;

mod stopwords;

pub use aggregate::{aggregate, AggregatedResponse, ArticleSummary};
pub use bootstrap::{build_query_service, check_embedding_dimension};
pub use emotion::{shared_classifier, ClassifierBackend, EmotionClassifier, EmotionScore, TeiClassifier};
pub use enrich::{ArticleOutcome, Enricher, EnrichmentReport, Stage};
pub use error::PipelineError;
pub use inference::{select_provider, shared_provider, InferenceProvider};
pub use news::{news_source_from_config, NewsSource};
pub use normalize::normalize;
pub use service::QueryService;
pub use store::{store_from_config, EventStore, MemoryStore, QdrantStore};
