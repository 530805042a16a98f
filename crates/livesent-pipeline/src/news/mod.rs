//! News collaborators that turn a location query into [`Article`]s.

mod rss;
mod serper;

use std::sync::Arc;

use async_trait::async_trait;
use livesent_core::{AppConfig, Article};

use crate::error::PipelineError;

pub use rss::{parse_rss_feed, GoogleNewsRss};
pub use serper::SerperClient;

#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Recent articles for `query`. An empty list is a valid answer.
    ///
    /// # Errors
    ///
    /// Network and parse failures, reported as upstream errors.
    async fn fetch_news(&self, query: &str) -> Result<Vec<Article>, PipelineError>;
}

/// Serper when a key is configured, Google News RSS otherwise.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] if an HTTP client cannot be built.
pub fn news_source_from_config(config: &AppConfig) -> Result<Arc<dyn NewsSource>, PipelineError> {
    let source: Arc<dyn NewsSource> = match config.serper_api_key.as_deref() {
        Some(key) => Arc::new(SerperClient::new(
            key,
            config.news_results,
            config.inference_timeout_secs,
        )?),
        None => {
            tracing::warn!("SERPER_API_KEY is not set, using Google News RSS");
            Arc::new(GoogleNewsRss::new(
                config.news_results,
                config.inference_timeout_secs,
            )?)
        }
    };
    Ok(source)
}
