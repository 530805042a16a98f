//! Serper.dev news search client.

use async_trait::async_trait;
use livesent_core::Article;
use serde::{Deserialize, Serialize};

use super::NewsSource;
use crate::error::PipelineError;
use crate::inference::http_client;

const DEFAULT_BASE_URL: &str = "https://google.serper.dev";

pub struct SerperClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
    num_results: usize,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    news: Vec<NewsItem>,
    #[serde(default)]
    top_stories: Vec<NewsItem>,
}

#[derive(Deserialize)]
struct NewsItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

impl SerperClient {
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, num_results: usize, timeout_secs: u64) -> Result<Self, PipelineError> {
        Self::with_base_url(api_key, num_results, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Point at a custom host (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be built.
    pub fn with_base_url(
        api_key: &str,
        num_results: usize,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            api_key: api_key.to_string(),
            url: format!("{}/news", base_url.trim_end_matches('/')),
            num_results,
        })
    }
}

#[async_trait]
impl NewsSource for SerperClient {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn fetch_news(&self, query: &str) -> Result<Vec<Article>, PipelineError> {
        let response = self
            .client
            .post(&self.url)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest {
                q: query,
                num: self.num_results,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::News(format!(
                "Serper returned status {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::News(format!("Serper response parse error: {e}")))?;
        let items = if body.news.is_empty() {
            body.top_stories
        } else {
            body.news
        };

        let articles: Vec<Article> = items
            .into_iter()
            .filter_map(|item| {
                let title = item.title.map(|t| t.trim().to_string())?;
                if title.is_empty() {
                    return None;
                }
                Some(Article {
                    title,
                    snippet: item.snippet.unwrap_or_default(),
                    link: item.link.unwrap_or_default(),
                    source: item.source,
                    date: item.date,
                })
            })
            .collect();
        tracing::debug!(query, count = articles.len(), "fetched Serper news");
        Ok(articles)
    }
}
