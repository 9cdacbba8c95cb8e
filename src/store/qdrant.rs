//! Qdrant HTTP client
//!
//! Implements [`VectorStore`] against Qdrant's REST API. Write calls use
//! `wait=true` so a completed request means the change is visible to the
//! next read. Transient failures (429 and 5xx) are retried with capped
//! exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::store::{ChunkPoint, ScoredChunk, SearchParams, StoreError, VectorStore};

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(8);

/// Qdrant-backed [`VectorStore`]
#[derive(Debug, Clone)]
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl QdrantStore {
    /// Create a client for `base_url` (e.g. `http://localhost:6333`),
    /// operating on `collection`. The API key, when present, is sent on
    /// every request.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<&str>,
        collection: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(StoreError::Config("base URL must not be empty".to_string()));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = api_key {
            let value = reqwest::header::HeaderValue::from_str(key)
                .map_err(|_| StoreError::Config("API key contains invalid characters".to_string()))?;
            headers.insert("api-key", value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.into(),
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    /// Send a request, retrying 429 and 5xx responses with exponential
    /// backoff. `build` must produce an equivalent request on every call.
    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response, StoreError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            let response = build().send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            let retryable =
                status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if !retryable || attempt >= MAX_RETRIES {
                let message = response.text().await.unwrap_or_default();
                return Err(StoreError::Api {
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
                delay_ms = delay.as_millis() as u64,
                "Store request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn url_filter(url: &str) -> Value {
        json!({
            "must": [
                { "key": "url", "match": { "value": url } }
            ]
        })
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<PayloadPoint>,
}

#[derive(Deserialize)]
struct PayloadPoint {
    payload: crate::store::ChunkPayload,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Deserialize)]
struct SearchHit {
    score: f32,
    payload: crate::store::ChunkPayload,
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), StoreError> {
        let probe = self.client.get(self.collection_url("")).send().await?;
        if probe.status().is_success() {
            debug!(collection = %self.collection, "Collection exists");
            return Ok(());
        }
        if probe.status() != StatusCode::NOT_FOUND {
            let status = probe.status().as_u16();
            let message = probe.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, message });
        }

        let body = json!({
            "vectors": { "size": dimensions, "distance": "Cosine" }
        });
        self.send_with_retry(|| self.client.put(self.collection_url("")).json(&body))
            .await?;
        info!(collection = %self.collection, dimensions, "Created collection");
        Ok(())
    }

    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<(), StoreError> {
        if points.is_empty() {
            return Ok(());
        }
        let body = json!({
            "points": points
                .iter()
                .map(|p| json!({
                    "id": p.id,
                    "vector": p.vector,
                    "payload": p.payload,
                }))
                .collect::<Vec<_>>()
        });
        self.send_with_retry(|| {
            self.client
                .put(self.collection_url("/points?wait=true"))
                .json(&body)
        })
        .await?;
        debug!(count = points.len(), "Upserted points");
        Ok(())
    }

    async fn delete_stale(&self, url: &str, keep_hash: &str) -> Result<(), StoreError> {
        let body = json!({
            "filter": {
                "must": [
                    { "key": "url", "match": { "value": url } }
                ],
                "must_not": [
                    { "key": "content_hash", "match": { "value": keep_hash } }
                ]
            }
        });
        self.send_with_retry(|| {
            self.client
                .post(self.collection_url("/points/delete?wait=true"))
                .json(&body)
        })
        .await?;
        debug!(url, "Deleted stale points");
        Ok(())
    }

    async fn stored_hash(&self, url: &str) -> Result<Option<String>, StoreError> {
        let body = json!({
            "filter": Self::url_filter(url),
            "limit": 1,
            "with_payload": true,
            "with_vector": false,
        });
        let response = self
            .send_with_retry(|| {
                self.client
                    .post(self.collection_url("/points/scroll"))
                    .json(&body)
            })
            .await?;
        let envelope: Envelope<ScrollResult> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(envelope
            .result
            .points
            .into_iter()
            .next()
            .map(|p| p.payload.content_hash))
    }

    async fn count_by_url(&self, url: &str) -> Result<usize, StoreError> {
        let body = json!({
            "filter": Self::url_filter(url),
            "exact": true,
        });
        let response = self
            .send_with_retry(|| {
                self.client
                    .post(self.collection_url("/points/count"))
                    .json(&body)
            })
            .await?;
        let envelope: Envelope<CountResult> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(envelope.result.count)
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        params: &SearchParams,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let mut body = json!({
            "vector": vector,
            "limit": params.limit,
            "with_payload": true,
        });
        if let Some(threshold) = params.score_threshold {
            body["score_threshold"] = json!(threshold);
        }
        if let Some(url) = &params.url_filter {
            body["filter"] = Self::url_filter(url);
        }
        let response = self
            .send_with_retry(|| {
                self.client
                    .post(self.collection_url("/points/search"))
                    .json(&body)
            })
            .await?;
        let envelope: Envelope<Vec<SearchHit>> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(envelope
            .result
            .into_iter()
            .map(|hit| ScoredChunk {
                score: hit.score,
                payload: hit.payload,
            })
            .collect())
    }
}
