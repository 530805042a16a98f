use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which inference stack serves summarization and embeddings.
///
/// Chosen once per process; every vector in a store must come from the same
/// backend, so this is never switched per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceBackend {
    /// Self-hosted summarization server plus TEI embeddings.
    Local,
    /// Gemini API, with the local summarizer as a per-call fallback.
    Cloud,
}

impl std::fmt::Display for InferenceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceBackend::Local => write!(f, "local"),
            InferenceBackend::Cloud => write!(f, "cloud"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Qdrant,
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Qdrant => write!(f, "qdrant"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub inference_backend: InferenceBackend,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_summary_model: String,
    pub gemini_embed_model: String,
    pub summarizer_url: String,
    pub tei_embed_url: String,
    pub tei_classifier_url: String,
    pub embedding_dim: usize,
    pub store_backend: StoreBackend,
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub serper_api_key: Option<String>,
    pub news_results: usize,
    pub inference_timeout_secs: u64,
    pub store_timeout_secs: u64,
    pub enrich_concurrency: usize,
    pub similar_k: usize,
    pub rate_limit_per_minute: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("inference_backend", &self.inference_backend)
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_summary_model", &self.gemini_summary_model)
            .field("gemini_embed_model", &self.gemini_embed_model)
            .field("summarizer_url", &self.summarizer_url)
            .field("tei_embed_url", &self.tei_embed_url)
            .field("tei_classifier_url", &self.tei_classifier_url)
            .field("embedding_dim", &self.embedding_dim)
            .field("store_backend", &self.store_backend)
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_collection", &self.qdrant_collection)
            .field(
                "serper_api_key",
                &self.serper_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("news_results", &self.news_results)
            .field("inference_timeout_secs", &self.inference_timeout_secs)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .field("enrich_concurrency", &self.enrich_concurrency)
            .field("similar_k", &self.similar_k)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}
