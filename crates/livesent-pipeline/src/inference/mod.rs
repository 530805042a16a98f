//! Summarization and embedding providers.
//!
//! One provider is chosen per process from
//! [`AppConfig::inference_backend`](livesent_core::AppConfig) and shared by
//! every request, so all vectors written to a store come from the same model.

mod cloud;
mod local;
mod tei;

use std::sync::Arc;

use async_trait::async_trait;
use livesent_core::{AppConfig, InferenceBackend};
use tokio::sync::OnceCell;

use crate::error::PipelineError;

pub use cloud::CloudProvider;
pub use local::LocalProvider;
pub use tei::TeiEmbedder;

/// Uniform summarize/embed capability.
///
/// An empty `Vec` from `embed` means "no embedding" rather than failure;
/// callers must not store or search with it.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    async fn summarize(&self, text: &str) -> Result<String, PipelineError>;

    /// Summaries in input order, one per text.
    async fn summarize_batch(&self, texts: &[String]) -> Result<Vec<String>, PipelineError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;

    /// Embeddings in input order, one per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;
}

static SHARED_PROVIDER: OnceCell<Arc<dyn InferenceProvider>> = OnceCell::const_new();

/// Build the provider named by the config.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] when the cloud backend is selected
/// without an API key, or an HTTP client cannot be constructed.
pub fn select_provider(config: &AppConfig) -> Result<Arc<dyn InferenceProvider>, PipelineError> {
    let provider: Arc<dyn InferenceProvider> = match config.inference_backend {
        InferenceBackend::Local => Arc::new(LocalProvider::from_config(config)?),
        InferenceBackend::Cloud => Arc::new(CloudProvider::from_config(config)?),
    };
    tracing::info!(provider = provider.name(), "inference provider selected");
    Ok(provider)
}

/// Process-wide provider, built on first use.
///
/// Later calls return the same instance regardless of `config`.
///
/// # Errors
///
/// Propagates [`select_provider`] failures. A failed construction is not
/// cached, but callers treat it as fatal at startup.
pub async fn shared_provider(
    config: &AppConfig,
) -> Result<Arc<dyn InferenceProvider>, PipelineError> {
    SHARED_PROVIDER
        .get_or_try_init(|| async { select_provider(config) })
        .await
        .cloned()
}

/// Trim and flatten newlines the way every provider expects its input.
pub(crate) fn clean_input(text: &str) -> String {
    text.trim().replace(['\r', '\n'], " ")
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, PipelineError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(10))
        .user_agent("livesent/0.1")
        .build()
        .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_input_trims_and_flattens_newlines() {
        assert_eq!(clean_input("  line one\nline two\r\n"), "line one line two");
        assert_eq!(clean_input(" \n "), "");
    }
}
