//! OpenAI-compatible embeddings client.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use crate::embedding::{check_dimension, EmbeddingProvider};
use crate::error::{EmbedError, Error, Result};
use crate::model::Embedding;

/// Longest server-requested `Retry-After` honoured before giving up.
pub const MAX_RETRY_WAIT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    max_retries: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::InvalidArgument("missing embedding API key".into()));
        }
        if model.trim().is_empty() {
            return Err(Error::InvalidArgument("missing embedding model name".into()));
        }
        if dimension == 0 {
            return Err(Error::InvalidArgument("embedding dimension must be positive".into()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| Error::InvalidArgument("API key is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::InvalidArgument(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimension,
            max_retries,
        })
    }

    async fn request(&self, inputs: &[&str]) -> std::result::Result<Vec<Embedding>, EmbedError> {
        let mut attempt = 0usize;
        loop {
            match self.send_once(inputs).await {
                Err(err) if is_retryable(&err) && attempt < self.max_retries => {
                    attempt += 1;
                    let wait = retry_backoff(attempt, &err);
                    if wait > MAX_RETRY_WAIT {
                        tracing::debug!(?wait, "server asked for a longer wait than allowed, giving up");
                        return Err(err);
                    }
                    tracing::debug!(attempt, ?wait, "embedding request failed, retrying: {}", err);
                    tokio::time::sleep(wait).await;
                }
                other => return other,
            }
        }
    }

    async fn send_once(&self, inputs: &[&str]) -> std::result::Result<Vec<Embedding>, EmbedError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            // Only the v3 models accept a requested size
            dimensions: self.model.starts_with("text-embedding-3").then_some(self.dimension),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbedError::Unavailable(transport_reason(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_failure(status, response).await);
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Unavailable(format!("malformed embeddings response: {e}")))?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(EmbedError::Unavailable(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        let mut out = Vec::with_capacity(parsed.data.len());
        for entry in parsed.data {
            check_dimension(self.dimension, &entry.embedding)?;
            out.push(entry.embedding);
        }
        Ok(out)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> std::result::Result<Embedding, EmbedError> {
        let mut batch = self.embed_batch(&[text]).await?;
        batch
            .pop()
            .ok_or_else(|| EmbedError::Unavailable("provider returned no embedding".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> std::result::Result<Vec<Embedding>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        // The API refuses empty strings; a lone space embeds to a defined vector
        let inputs: Vec<&str> = texts.iter().map(|t| if t.is_empty() { " " } else { *t }).collect();
        self.request(&inputs).await
    }
}

async fn classify_failure(status: StatusCode, response: Response) -> EmbedError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return EmbedError::RateLimited { retry_after };
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        EmbedError::Unavailable(format!("{status}: {body}"))
    } else {
        EmbedError::InvalidInput(format!("{status}: {body}"))
    }
}

fn transport_reason(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("could not connect: {err}")
    } else {
        err.to_string()
    }
}

fn is_retryable(err: &EmbedError) -> bool {
    matches!(err, EmbedError::RateLimited { .. } | EmbedError::Unavailable(_))
}

fn retry_backoff(attempt: usize, err: &EmbedError) -> Duration {
    if let EmbedError::RateLimited { retry_after: Some(wait) } = err {
        return *wait;
    }
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    #[serde(borrow)]
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
