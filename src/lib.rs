//! rag_compare - lexical vs. vector retrieval as the context stage of a RAG pipeline.
//!
//! A plain-text corpus is cut into overlapping sentence-window chunks, indexed in both
//! Solr (BM25) and Milvus (HNSW over dense embeddings), and queried through one pipeline
//! that retrieves passages from either engine and asks a generative model to answer
//! from those passages only. An evaluation harness replays a gold standard against both
//! engines and reports Recall@k, MRR@k, ROUGE-L and latency per backend.
//!
//! # Quick Start
//!
//! ```no_run
//! use rag_compare::{Config, QueryRequest, RagPipeline, ServiceHandles};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     config.validate()?;
//!
//!     let handles = ServiceHandles::from_config(&config)?;
//!     let pipeline = RagPipeline::new(Arc::new(handles));
//!
//!     let response = pipeline
//!         .ask(&QueryRequest::new("¿Qué dice el informe sobre el desplazamiento?", "vector", 5))
//!         .await?;
//!
//!     println!("{}", response.answer);
//!     for doc in &response.source_documents {
//!         println!("  [{}] {}", doc.id, doc.source_file);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **segment**: sentence splitting and chunk windows with stable ids
//! - **backend**: Solr and Milvus clients behind the `LexicalEngine` / `VectorEngine` traits
//! - **embed** / **llm**: embedding and generation providers
//! - **retrieval** / **answer** / **service**: the query pipeline
//! - **indexer**: loads the chunk table into both engines
//! - **eval**: gold standard, metrics, harness and reports

pub mod answer;
pub mod backend;
pub mod config;
pub mod document;
pub mod embed;
pub mod error;
pub mod eval;
pub mod indexer;
pub mod language;
pub mod llm;
pub mod persistence;
pub mod retrieval;
pub mod segment;
pub mod service;
pub mod synonyms;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use answer::{AnswerOutcome, OutcomeKind};
pub use backend::{Backend, LexicalEngine, SearchHit, VectorEngine};
pub use config::Config;
pub use document::Document;
pub use embed::EmbeddingProvider;
pub use error::{RagError, Result};
pub use indexer::{ChunkSink, CorpusIndexer, MilvusSink, SinkReport};
pub use language::Language;
pub use llm::GenerativeProvider;
pub use persistence::{load_chunks, save_chunks};
pub use retrieval::{RetrievalResult, RetrievedPassage, retrieve};
pub use segment::{Chunk, ChunkOptions, Segmenter};
pub use service::{QueryRequest, QueryResponse, RagPipeline, ServiceHandles};
