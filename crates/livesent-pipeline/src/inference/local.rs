//! Self-hosted inference: a summarization server plus TEI embeddings.

use async_trait::async_trait;
use livesent_core::AppConfig;
use serde::{Deserialize, Serialize};

use super::{clean_input, http_client, InferenceProvider, TeiEmbedder};
use crate::error::PipelineError;

/// Token cap for generated summaries.
const SUMMARY_MAX_LENGTH: u32 = 128;

pub struct LocalProvider {
    client: reqwest::Client,
    summarize_url: String,
    embedder: TeiEmbedder,
}

#[derive(Serialize)]
struct SummarizeRequest<'a, T: Serialize + ?Sized> {
    inputs: &'a T,
    parameters: SummarizeParameters,
}

#[derive(Serialize)]
struct SummarizeParameters {
    max_length: u32,
    truncation: bool,
}

#[derive(Deserialize)]
struct SummaryItem {
    summary_text: String,
}

impl LocalProvider {
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        Self::with_urls(
            &config.summarizer_url,
            &config.tei_embed_url,
            config.inference_timeout_secs,
        )
    }

    /// Point at explicit servers (used by tests with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be built.
    pub fn with_urls(
        summarizer_url: &str,
        tei_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, PipelineError> {
        let client = http_client(timeout_secs)?;
        Ok(Self {
            summarize_url: format!("{}/summarize", summarizer_url.trim_end_matches('/')),
            embedder: TeiEmbedder::new(client.clone(), tei_url),
            client,
        })
    }

    async fn request_summaries<T: Serialize + ?Sized>(
        &self,
        inputs: &T,
        expected: usize,
    ) -> Result<Vec<String>, PipelineError> {
        let body = SummarizeRequest {
            inputs,
            parameters: SummarizeParameters {
                max_length: SUMMARY_MAX_LENGTH,
                truncation: true,
            },
        };
        let response = self
            .client
            .post(&self.summarize_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Summarizer(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::Summarizer(format!(
                "summarizer returned status {}",
                response.status()
            )));
        }

        let items: Vec<SummaryItem> = response
            .json()
            .await
            .map_err(|e| PipelineError::Summarizer(format!("response parse error: {e}")))?;

        if items.len() != expected {
            return Err(PipelineError::Summarizer(format!(
                "summarizer returned {} summaries for {expected} inputs",
                items.len()
            )));
        }

        Ok(items
            .into_iter()
            .map(|item| item.summary_text.trim().to_string())
            .collect())
    }
}

#[async_trait]
impl InferenceProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn summarize(&self, text: &str) -> Result<String, PipelineError> {
        let text = clean_input(text);
        if text.is_empty() {
            tracing::debug!("empty text received for summarization");
            return Ok(String::new());
        }
        let mut summaries = self.request_summaries(text.as_str(), 1).await?;
        Ok(summaries.pop().unwrap_or_default())
    }

    async fn summarize_batch(&self, texts: &[String]) -> Result<Vec<String>, PipelineError> {
        let cleaned: Vec<String> = texts.iter().map(|t| clean_input(t)).collect();
        let pending: Vec<String> = cleaned.iter().filter(|t| !t.is_empty()).cloned().collect();
        if pending.is_empty() {
            return Ok(vec![String::new(); texts.len()]);
        }

        let mut summaries = self
            .request_summaries(pending.as_slice(), pending.len())
            .await?
            .into_iter();
        Ok(cleaned
            .iter()
            .map(|t| {
                if t.is_empty() {
                    String::new()
                } else {
                    summaries.next().unwrap_or_default()
                }
            })
            .collect())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let text = clean_input(text);
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let mut vectors = self.embedder.embed(&[text]).await?;
        Ok(vectors.pop().unwrap_or_default())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let cleaned: Vec<String> = texts.iter().map(|t| clean_input(t)).collect();
        let pending: Vec<String> = cleaned.iter().filter(|t| !t.is_empty()).cloned().collect();
        if pending.is_empty() {
            return Ok(vec![Vec::new(); texts.len()]);
        }

        let mut vectors = self.embedder.embed(&pending).await?.into_iter();
        Ok(cleaned
            .iter()
            .map(|t| {
                if t.is_empty() {
                    Vec::new()
                } else {
                    vectors.next().unwrap_or_default()
                }
            })
            .collect())
    }
}
