//! Milvus client over the RESTful API v2.
//!
//! Every endpoint is a `POST` returning `{code, data, message}`; a non-zero
//! `code` is an error even when the HTTP status is 200.

use super::{SearchHit, VectorEngine};
use crate::config::MilvusConfig;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

const SERVICE: &str = "milvus";

/// Client for one Milvus collection.
#[derive(Clone)]
pub struct MilvusClient {
    client: Client,
    config: MilvusConfig,
}

impl MilvusClient {
    pub fn new(config: MilvusConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &MilvusConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v2/vectordb/{}", self.config.base_url(), path)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let mut request = self.client.post(self.endpoint(path)).json(&body);
        if !self.config.token.is_empty() {
            request = request.bearer_auth(&self.config.token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RagError::backend(SERVICE, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RagError::backend(SERVICE, e))?;

        if !status.is_success() {
            return Err(RagError::backend(
                SERVICE,
                format!("HTTP {} on {}: {}", status, path, text),
            ));
        }

        let value: Value = serde_json::from_str(&text).map_err(|e| RagError::backend(SERVICE, e))?;
        unwrap_envelope(value)
    }

    /// Whether the configured collection exists.
    pub async fn has_collection(&self) -> Result<bool> {
        let data = self
            .post(
                "collections/has",
                json!({ "collectionName": self.config.collection }),
            )
            .await?;
        Ok(data.get("has").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Create the collection with an HNSW index on the vector field.
    pub async fn create_collection(&self, dimension: usize) -> Result<()> {
        self.post("collections/create", self.create_request(dimension))
            .await?;
        tracing::info!(collection = %self.config.collection, dimension, "milvus collection created");
        Ok(())
    }

    fn create_request(&self, dimension: usize) -> Value {
        let c = &self.config;
        json!({
            "collectionName": c.collection,
            "schema": {
                "autoId": false,
                "enableDynamicField": false,
                "fields": [
                    {
                        "fieldName": c.id_field,
                        "dataType": "VarChar",
                        "isPrimary": true,
                        "elementTypeParams": { "max_length": 256 }
                    },
                    {
                        "fieldName": c.text_field,
                        "dataType": "VarChar",
                        "elementTypeParams": { "max_length": 65535 }
                    },
                    {
                        "fieldName": c.source_field,
                        "dataType": "VarChar",
                        "elementTypeParams": { "max_length": 512 }
                    },
                    {
                        "fieldName": c.vector_field,
                        "dataType": "FloatVector",
                        "elementTypeParams": { "dim": dimension.to_string() }
                    }
                ]
            },
            "indexParams": [
                {
                    "fieldName": c.vector_field,
                    "indexName": format!("{}_hnsw", c.vector_field),
                    "metricType": "L2",
                    "indexType": "HNSW",
                    "params": { "M": 8, "efConstruction": 64 }
                }
            ]
        })
    }

    /// Insert rows of `(id, text, source, vector)`.
    pub async fn insert(&self, rows: &[(String, String, String, Vec<f32>)]) -> Result<()> {
        let c = &self.config;
        let data: Vec<Value> = rows
            .iter()
            .map(|(id, text, source, vector)| {
                let mut row = serde_json::Map::new();
                row.insert(c.id_field.clone(), json!(id));
                row.insert(c.text_field.clone(), json!(text));
                row.insert(c.source_field.clone(), json!(source));
                row.insert(c.vector_field.clone(), json!(vector));
                Value::Object(row)
            })
            .collect();

        self.post(
            "entities/insert",
            json!({ "collectionName": c.collection, "data": data }),
        )
        .await?;
        Ok(())
    }

    /// Load the collection into memory so it can be searched.
    pub async fn load_collection(&self) -> Result<()> {
        self.post(
            "collections/load",
            json!({ "collectionName": self.config.collection }),
        )
        .await?;
        Ok(())
    }

    fn search_request(&self, vector: &[f32], limit: usize) -> Value {
        let c = &self.config;
        json!({
            "collectionName": c.collection,
            "data": [vector],
            "annsField": c.vector_field,
            "limit": limit,
            "outputFields": [c.id_field, c.text_field, c.source_field],
            "searchParams": {
                "metricType": "L2",
                "params": { "ef": c.ef.max(limit as u32) }
            }
        })
    }

    fn parse_hits(&self, data: &Value) -> Result<Vec<SearchHit>> {
        let rows = data
            .as_array()
            .ok_or_else(|| RagError::backend(SERVICE, "search data is not an array"))?;

        rows.iter()
            .map(|row| {
                let text = |field: &str| row.get(field).and_then(Value::as_str).map(String::from);
                let id = text(&self.config.id_field).ok_or_else(|| {
                    RagError::backend(SERVICE, format!("hit without '{}'", self.config.id_field))
                })?;
                Ok(SearchHit {
                    id,
                    content: text(&self.config.text_field).unwrap_or_default(),
                    source_file: text(&self.config.source_field).unwrap_or_default(),
                    score: row.get("distance").and_then(Value::as_f64).map(|d| d as f32),
                })
            })
            .collect()
    }
}

#[async_trait]
impl VectorEngine for MilvusClient {
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let data = self
            .post("entities/search", self.search_request(vector, limit))
            .await?;
        self.parse_hits(&data)
    }

    async fn ping(&self) -> Result<()> {
        if self.has_collection().await? {
            Ok(())
        } else {
            Err(RagError::backend(
                SERVICE,
                format!("collection '{}' does not exist", self.config.collection),
            ))
        }
    }
}

fn unwrap_envelope(value: Value) -> Result<Value> {
    let code = value.get("code").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message");
        return Err(RagError::backend(
            SERVICE,
            format!("code {}: {}", code, message),
        ));
    }
    Ok(value.get("data").cloned().unwrap_or(Value::Null))
}
