//! Embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! Self-hosted embedding servers (text-embeddings-inference, vLLM, Infinity)
//! expose the same request shape, which is how the Qwen3 embedding model that
//! indexed the knowledge base is served.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:8080/v1";

/// Model the `sb100` collection was indexed with.
pub const DEFAULT_EMBEDDING_MODEL: &str = "Qwen/Qwen3-Embedding-0.6B";

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1024;

const PROVIDER: &str = "openai-compatible";

/// An [`EmbeddingProvider`] calling `POST {base_url}/embeddings`.
///
/// ```rust,ignore
/// use soil_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("http://localhost:8080/v1")
///     .with_model("Qwen/Qwen3-Embedding-0.6B");
/// let vector = provider.embed("calagem em solo ácido").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddingProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }

    fn err(message: impl Into<String>) -> RagError {
        RagError::EmbeddingError { provider: PROVIDER.into(), message: message.into() }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Object { message: String },
    Text(String),
}

impl ErrorDetail {
    fn into_message(self) -> String {
        match self {
            ErrorDetail::Object { message } | ErrorDetail::Text(message) => message,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| Self::err("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let mut request = self
            .client
            .post(self.embeddings_url())
            .json(&EmbeddingRequest { model: &self.model, input: texts.to_vec() });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "request failed");
            Self::err(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.into_message())
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(Self::err(format!("API returned {status}: {detail}")));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            Self::err(format!("failed to parse response: {e}"))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(Self::err(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        if let Some(bad) = parsed.data.iter().find(|d| d.embedding.len() != self.dimensions) {
            error!(
                provider = PROVIDER,
                expected = self.dimensions,
                got = bad.embedding.len(),
                "dimension mismatch"
            );
            return Err(Self::err(format!(
                "expected {}-dimensional embeddings from {}, got {}",
                self.dimensions,
                self.model,
                bad.embedding.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index.unwrap_or_default());
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let provider = OpenAIEmbeddingProvider::new(DEFAULT_EMBEDDING_URL);
        assert_eq!(provider.model(), "Qwen/Qwen3-Embedding-0.6B");
        assert_eq!(provider.dimensions(), 1024);
        assert_eq!(provider.embeddings_url(), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn test_empty_api_key_is_ignored() {
        let provider = OpenAIEmbeddingProvider::new("http://x/").with_api_key("");
        assert!(provider.api_key.is_none());
        assert_eq!(provider.embeddings_url(), "http://x/embeddings");
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let provider = OpenAIEmbeddingProvider::new("http://127.0.0.1:1");
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
