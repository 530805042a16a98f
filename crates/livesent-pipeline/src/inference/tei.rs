//! TEI (Text Embeddings Inference) client for vector generation.

use serde::Serialize;

use crate::error::PipelineError;

/// Maximum number of texts per /embed call.
const BATCH_SIZE: usize = 64;

/// TEI HTTP client.
pub struct TeiEmbedder {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
}

impl TeiEmbedder {
    #[must_use]
    pub fn new(client: reqwest::Client, tei_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/embed", tei_url.trim_end_matches('/')),
        }
    }

    /// Generate embeddings for a batch of texts.
    ///
    /// Texts are batched into groups of [`BATCH_SIZE`] (64) per request.
    /// Returns one embedding vector per input text, in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Tei`] if the request fails or the response
    /// cannot be parsed.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = EmbedRequest {
                inputs: chunk,
                truncate: true,
            };
            let response = self
                .client
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(|e| PipelineError::Tei(format!("TEI request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(PipelineError::Tei(format!(
                    "TEI returned status {}",
                    response.status()
                )));
            }

            let embeddings: Vec<Vec<f32>> = response
                .json()
                .await
                .map_err(|e| PipelineError::Tei(format!("TEI response parse error: {e}")))?;

            if embeddings.len() != chunk.len() {
                return Err(PipelineError::Tei(format!(
                    "TEI returned {} embeddings for {} inputs",
                    embeddings.len(),
                    chunk.len()
                )));
            }

            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }
}
