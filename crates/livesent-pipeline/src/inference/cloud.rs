//! Gemini API provider.
//!
//! Summaries fall back to the local summarizer per call. Embeddings never
//! fall back: a failure yields an empty vector so no foreign-dimension
//! vector reaches the store.

use std::sync::Arc;

use async_trait::async_trait;
use livesent_core::AppConfig;
use serde::{Deserialize, Serialize};

use super::{clean_input, http_client, InferenceProvider, LocalProvider};
use crate::error::PipelineError;

const TEMPERATURE: f32 = 0.1;
const MAX_OUTPUT_TOKENS: u32 = 256;

pub struct CloudProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    summary_model: String,
    embed_model: String,
    embedding_dim: usize,
    fallback: Arc<LocalProvider>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

impl CloudProvider {
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when `GEMINI_API_KEY` is absent or an
    /// HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| PipelineError::Config("GEMINI_API_KEY is not set".to_string()))?;
        let fallback = Arc::new(LocalProvider::from_config(config)?);
        Self::with_base_url(
            &api_key,
            &config.gemini_base_url,
            &config.gemini_summary_model,
            &config.gemini_embed_model,
            config.embedding_dim,
            config.inference_timeout_secs,
            fallback,
        )
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be built.
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        summary_model: &str,
        embed_model: &str,
        embedding_dim: usize,
        timeout_secs: u64,
        fallback: Arc<LocalProvider>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            summary_model: summary_model.to_string(),
            embed_model: embed_model.to_string(),
            embedding_dim,
            fallback,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{model}:{method}", self.base_url)
    }

    fn embed_request(&self, text: &str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: format!("models/{}", self.embed_model),
            content: Content {
                role: None,
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
            output_dimensionality: self.embedding_dim,
        }
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, PipelineError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| PipelineError::Gemini(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::Gemini(format!(
                "Gemini returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::Gemini(format!("response parse error: {e}")))
    }

    async fn generate_summary(&self, text: &str) -> Result<String, PipelineError> {
        let prompt = format!(
            "Summarize the following news story in one short paragraph. \
             Preserve all key facts and emotional tone.\n\nArticle:\n{text}\n\nSummary:"
        );
        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };
        let url = self.model_url(&self.summary_model, "generateContent");
        let response: GenerateResponse = self.post_json(&url, &body).await?;

        let summary: String = response
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(PipelineError::Gemini("empty summary".to_string()));
        }
        Ok(summary.to_string())
    }

    async fn summarize_or_fallback(&self, text: &str) -> Result<String, PipelineError> {
        match self.generate_summary(text).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::warn!(error = %e, "Gemini summarization failed, using local summarizer");
                self.fallback.summarize(text).await
            }
        }
    }
}

#[async_trait]
impl InferenceProvider for CloudProvider {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn summarize(&self, text: &str) -> Result<String, PipelineError> {
        let text = clean_input(text);
        if text.is_empty() {
            tracing::debug!("empty text received for summarization");
            return Ok(String::new());
        }
        self.summarize_or_fallback(&text).await
    }

    async fn summarize_batch(&self, texts: &[String]) -> Result<Vec<String>, PipelineError> {
        let mut summaries = Vec::with_capacity(texts.len());
        for text in texts {
            summaries.push(self.summarize(text).await?);
        }
        Ok(summaries)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let text = clean_input(text);
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.model_url(&self.embed_model, "embedContent");
        let body = self.embed_request(&text);
        match self.post_json::<_, EmbedContentResponse>(&url, &body).await {
            Ok(response) => Ok(response.embedding.values),
            Err(e) => {
                tracing::warn!(error = %e, "Gemini embedding failed, returning empty vector");
                Ok(Vec::new())
            }
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.model_url(&self.embed_model, "batchEmbedContents");
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|t| self.embed_request(&clean_input(t)))
                .collect(),
        };
        match self.post_json::<_, BatchEmbedResponse>(&url, &body).await {
            Ok(response) if response.embeddings.len() == texts.len() => Ok(response
                .embeddings
                .into_iter()
                .map(|e| e.values)
                .collect()),
            Ok(response) => {
                tracing::warn!(
                    returned = response.embeddings.len(),
                    expected = texts.len(),
                    "Gemini batch embedding returned wrong count, returning empty vectors"
                );
                Ok(vec![Vec::new(); texts.len()])
            }
            Err(e) => {
                tracing::warn!(error = %e, "Gemini batch embedding failed, returning empty vectors");
                Ok(vec![Vec::new(); texts.len()])
            }
        }
    }
}
