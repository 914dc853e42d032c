//! Search backends.
//!
//! The core only sees two narrow traits: [`LexicalEngine`] takes the query text,
//! [`VectorEngine`] takes an embedding. Ranking is entirely the engine's business;
//! hits come back in the engine's order.

mod milvus;
mod solr;

pub use milvus::MilvusClient;
pub use solr::SolrClient;

use crate::error::{RagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One hit as returned by a search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Chunk id.
    pub id: String,
    pub content: String,
    pub source_file: String,
    /// Engine score, when the engine reports one. Not comparable across engines.
    pub score: Option<f32>,
}

/// Term-based search over an inverted index.
#[async_trait]
pub trait LexicalEngine: Send + Sync {
    /// Ranked hits for `query`, at most `limit` of them.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;

    /// Check that the engine is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Approximate nearest-neighbour search over chunk embeddings.
#[async_trait]
pub trait VectorEngine: Send + Sync {
    /// Ranked hits closest to `vector`, at most `limit` of them.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>>;

    /// Check that the engine is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Lexical search (Solr).
    Lexical,
    /// Vector similarity search (Milvus).
    Vector,
}

impl Backend {
    /// Both backends, in report order.
    pub const ALL: [Backend; 2] = [Backend::Lexical, Backend::Vector];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Lexical => "lexical",
            Backend::Vector => "vector",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lexical" | "solr" => Ok(Backend::Lexical),
            "vector" | "milvus" => Ok(Backend::Vector),
            other => Err(RagError::InvalidInput(format!(
                "unknown backend '{}', expected 'lexical' or 'vector'",
                other
            ))),
        }
    }
}

/// Parse a comma-separated backend list, dropping repeats.
pub fn parse_backends(list: &str) -> Result<Vec<Backend>> {
    let mut backends = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let backend: Backend = name.parse()?;
        if !backends.contains(&backend) {
            backends.push(backend);
        }
    }
    if backends.is_empty() {
        return Err(RagError::InvalidInput("no backend selected".to_string()));
    }
    Ok(backends)
}
