//! OpenAI-compatible embeddings client (`POST /v1/embeddings`).
//!
//! Works with text-embeddings-inference, vLLM, Ollama and hosted APIs.

use super::{EmbeddingProvider, check_dimension};
use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "embedding";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Embeddings over HTTP.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    config: EmbeddingConfig,
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/v1/embeddings", base)
    }

    fn decode(&self, body: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
        let mut response: EmbeddingResponse =
            serde_json::from_str(body).map_err(|e| RagError::backend(SERVICE, e))?;

        if response.data.len() != expected {
            return Err(RagError::backend(
                SERVICE,
                format!(
                    "expected {} embeddings, got {}",
                    expected,
                    response.data.len()
                ),
            ));
        }

        response.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();
        for vector in &vectors {
            check_dimension(vector, self.config.dimension)?;
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::backend(SERVICE, "empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RagError::backend(SERVICE, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RagError::backend(SERVICE, e))?;

        if !status.is_success() {
            return Err(RagError::backend(
                SERVICE,
                format!("HTTP {}: {}", status, body),
            ));
        }

        tracing::debug!(texts = texts.len(), model = %self.config.model, "embedded batch");
        self.decode(&body, texts.len())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(dimension: usize) -> HttpEmbedder {
        HttpEmbedder::new(EmbeddingConfig {
            api_base: "http://tei:8080/".to_string(),
            dimension,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(embedder(2).endpoint(), "http://tei:8080/v1/embeddings");
    }

    #[test]
    fn test_decode_orders_by_index() {
        let body = r#"{"data": [
            {"embedding": [0.3, 0.4], "index": 1},
            {"embedding": [0.1, 0.2], "index": 0}
        ]}"#;
        let vectors = embedder(2).decode(body, 2).unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_decode_rejects_wrong_dimension() {
        let body = r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}]}"#;
        assert!(matches!(
            embedder(2).decode(body, 1),
            Err(RagError::BackendUnavailable { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_count_mismatch() {
        let body = r#"{"data": []}"#;
        assert!(embedder(2).decode(body, 1).is_err());
    }
}
