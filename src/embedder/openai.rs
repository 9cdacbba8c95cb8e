//! OpenAI-compatible embeddings client
//!
//! Calls the `/embeddings` endpoint of any OpenAI-compatible API. Requests
//! are batched as the caller provides them; 429 and 5xx responses are
//! retried with capped exponential backoff. Defaults target
//! `text-embedding-3-small` at 1536 dimensions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::embedder::{EmbedError, EmbeddingProvider};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(8);

/// Embedding client for OpenAI-compatible APIs
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create a client with default model and endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self, EmbedError> {
        Self::builder().api_key(api_key).build()
    }

    /// Create a new builder
    pub fn builder() -> OpenAiEmbedderBuilder {
        OpenAiEmbedderBuilder::default()
    }
}

/// Builder for [`OpenAiEmbedder`]
#[derive(Debug, Default)]
pub struct OpenAiEmbedderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
}

impl OpenAiEmbedderBuilder {
    /// Set the API key (required)
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the embedding model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the vector dimensionality
    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Build the embedder
    pub fn build(self) -> Result<OpenAiEmbedder, EmbedError> {
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EmbedError::Config("API key is required".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(OpenAiEmbedder {
            client,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            dimensions: self.dimensions.unwrap_or(DEFAULT_DIMENSIONS),
        })
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": texts,
        });

        let mut attempt = 0u32;
        let response = loop {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            if status.is_success() {
                break response;
            }
            let retryable =
                status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if !retryable || attempt >= MAX_RETRIES {
                let message = response.text().await.unwrap_or_default();
                return Err(EmbedError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            let delay = RETRY_BASE_DELAY
                .saturating_mul(2u32.saturating_pow(attempt))
                .min(RETRY_MAX_DELAY);
            warn!(
                status = status.as_u16(),
                attempt = attempt + 1,
                "Embeddings request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        };

        let decoded: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Decode(e.to_string()))?;
        if decoded.data.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                actual: decoded.data.len(),
            });
        }

        // The API is free to reorder; restore input order by index.
        let mut items = decoded.data;
        items.sort_by_key(|item| item.index);
        debug!(count = items.len(), model = %self.model, "Embedded batch");
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
