#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{EmbeddingError, TextEmbedder};
use crate::config::EmbeddingConfig;
use crate::http::{self, JsonClient};

/// Client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    http: JsonClient,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    /// Build a client from config, reading the API key from the configured
    /// environment variable. An empty variable name disables authentication.
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = if config.api_key_env.is_empty() {
            None
        } else {
            Some(
                env::var(&config.api_key_env)
                    .map_err(|_| EmbeddingError::MissingApiKey(config.api_key_env.clone()))?,
            )
        };

        Ok(Self {
            http: JsonClient::new(
                Duration::from_secs(config.timeout_secs),
                config.retry_attempts,
            ),
            endpoint: http::endpoint(&config.base_url, "embeddings")?,
            model: config.model.clone(),
            api_key,
            batch_size: config.batch_size as usize,
            dimension: config.dimension as usize,
        })
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http.set_timeout(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.http.set_retry_attempts(attempts);
        self
    }

    /// Base delay between retries; doubles after each failed attempt.
    #[inline]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.http.set_backoff(backoff);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| EmbeddingError::Decode(format!("failed to encode request: {}", e)))?;

        let response_text = self
            .http
            .post(&self.endpoint, self.api_key.as_deref(), &request_json)?;

        let mut response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| EmbeddingError::Decode(e.to_string()))?;

        if response.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: response.data.len(),
            });
        }

        response.data.sort_by_key(|d| d.index);
        let mut vectors = Vec::with_capacity(texts.len());
        for (expected_index, data) in response.data.into_iter().enumerate() {
            if data.index != expected_index {
                return Err(EmbeddingError::Decode(format!(
                    "response indices are not a permutation of 0..{}",
                    texts.len()
                )));
            }
            if data.embedding.len() != self.dimension {
                return Err(EmbeddingError::Dimension {
                    expected: self.dimension,
                    actual: data.embedding.len(),
                });
            }
            vectors.push(data.embedding);
        }
        Ok(vectors)
    }
}

impl TextEmbedder for EmbeddingClient {
    /// Embed `texts` in batches of the configured size, preserving order.
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Embedding {} texts with {} (batch size {})",
            texts.len(),
            self.model,
            self.batch_size
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size.max(1)) {
            vectors.extend(self.embed_single_batch(chunk)?);
        }

        if texts.len() > 1 {
            info!("Generated {} embeddings", vectors.len());
        }
        Ok(vectors)
    }
}
