//! Apache Solr client over the HTTP JSON API.

use super::{LexicalEngine, SearchHit};
use crate::config::SolrConfig;
use crate::error::{RagError, Result};
use crate::segment::Chunk;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

const SERVICE: &str = "solr";

/// Client for one Solr core.
#[derive(Clone)]
pub struct SolrClient {
    client: Client,
    config: SolrConfig,
}

impl SolrClient {
    pub fn new(config: SolrConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SolrConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.core_url(), path)
    }

    /// `GET /admin/ping`.
    pub async fn ping_core(&self) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint("admin/ping"))
            .query(&[("wt", "json")])
            .send()
            .await
            .map_err(|e| RagError::backend(SERVICE, e))?;
        let body = read_json(response).await?;

        match body.get("status").and_then(Value::as_str) {
            Some("OK") | None => Ok(()),
            Some(other) => Err(RagError::backend(SERVICE, format!("ping status {}", other))),
        }
    }

    /// Add documents for `chunks` and commit.
    pub async fn add_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let docs: Vec<Value> = chunks.iter().map(|c| self.to_document(c)).collect();

        let response = self
            .client
            .post(self.endpoint("update"))
            .query(&[("commit", "true"), ("wt", "json")])
            .json(&docs)
            .send()
            .await
            .map_err(|e| RagError::backend(SERVICE, e))?;
        read_json(response).await?;

        tracing::debug!(docs = docs.len(), core = %self.config.core, "solr batch committed");
        Ok(())
    }

    fn to_document(&self, chunk: &Chunk) -> Value {
        let mut doc = Map::new();
        doc.insert(self.config.id_field.clone(), chunk.chunk_id.clone().into());
        doc.insert(self.config.text_field.clone(), chunk.text.clone().into());
        doc.insert(
            self.config.source_field.clone(),
            chunk.source_document.clone().into(),
        );
        Value::Object(doc)
    }

    fn parse_hits(&self, body: &Value) -> Result<Vec<SearchHit>> {
        let docs = body
            .pointer("/response/docs")
            .and_then(Value::as_array)
            .ok_or_else(|| RagError::backend(SERVICE, "response has no docs"))?;

        docs.iter()
            .map(|doc| {
                let id = field_text(doc, &self.config.id_field).ok_or_else(|| {
                    RagError::backend(SERVICE, format!("doc without '{}'", self.config.id_field))
                })?;
                Ok(SearchHit {
                    id,
                    content: field_text(doc, &self.config.text_field).unwrap_or_default(),
                    source_file: field_text(doc, &self.config.source_field).unwrap_or_default(),
                    score: doc.get("score").and_then(Value::as_f64).map(|s| s as f32),
                })
            })
            .collect()
    }
}

#[async_trait]
impl LexicalEngine for SolrClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let fields = format!(
            "{},{},{},score",
            self.config.id_field, self.config.text_field, self.config.source_field
        );
        let rows = limit.to_string();

        let response = self
            .client
            .get(self.endpoint("select"))
            .query(&[
                ("q", query),
                ("defType", "edismax"),
                ("qf", self.config.text_field.as_str()),
                ("rows", rows.as_str()),
                ("fl", fields.as_str()),
                ("wt", "json"),
            ])
            .send()
            .await
            .map_err(|e| RagError::backend(SERVICE, e))?;
        let body = read_json(response).await?;

        self.parse_hits(&body)
    }

    async fn ping(&self) -> Result<()> {
        self.ping_core().await
    }
}

/// Read a JSON body, turning non-2xx statuses into backend errors.
async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RagError::backend(SERVICE, e))?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.pointer("/error/msg").and_then(Value::as_str).map(String::from))
            .unwrap_or(body);
        return Err(RagError::backend(
            SERVICE,
            format!("HTTP {}: {}", status, message),
        ));
    }

    serde_json::from_str(&body).map_err(|e| RagError::backend(SERVICE, e))
}

/// Solr returns multi-valued fields as arrays; take the first value.
fn field_text(doc: &Value, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(values) => values.first().and_then(Value::as_str).map(String::from),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> SolrClient {
        SolrClient::new(SolrConfig::default()).unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().endpoint("select"),
            "http://localhost:8983/solr/rag_core/select"
        );
    }

    #[test]
    fn test_parse_hits_handles_array_fields() {
        let body = json!({
            "response": {
                "numFound": 2,
                "docs": [
                    {"id": "a.txt_0001", "text_txt_es": ["Texto uno."], "source_s": "a.txt", "score": 2.5},
                    {"id": "b.txt_0000", "text_txt_es": "Texto dos.", "source_s": ["b.txt"]}
                ]
            }
        });

        let hits = client().parse_hits(&body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a.txt_0001");
        assert_eq!(hits[0].content, "Texto uno.");
        assert_eq!(hits[0].score, Some(2.5));
        assert_eq!(hits[1].source_file, "b.txt");
        assert_eq!(hits[1].score, None);
    }

    #[test]
    fn test_parse_hits_rejects_malformed_body() {
        let err = client().parse_hits(&json!({"error": {}})).unwrap_err();
        assert!(matches!(err, RagError::BackendUnavailable { .. }));

        let err = client()
            .parse_hits(&json!({"response": {"docs": [{"text_txt_es": "x"}]}}))
            .unwrap_err();
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_document_uses_configured_fields() {
        let chunk = Chunk {
            chunk_id: "a.txt_0000".to_string(),
            text: "Hola.".to_string(),
            source_document: "a.txt".to_string(),
        };
        assert_eq!(
            client().to_document(&chunk),
            json!({"id": "a.txt_0000", "text_txt_es": "Hola.", "source_s": "a.txt"})
        );
    }
}
