//! Shared service handles and the query pipeline.

use crate::answer::{AnswerOutcome, OutcomeKind, assemble};
use crate::backend::{Backend, LexicalEngine, MilvusClient, SolrClient, VectorEngine};
use crate::config::Config;
use crate::embed::{self, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::language::Language;
use crate::llm::{self, GenerativeProvider};
use crate::retrieval::{RetrievalResult, retrieve};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Read-only handles built once at startup and shared by every request.
#[derive(Clone)]
pub struct ServiceHandles {
    pub lexical: Arc<dyn LexicalEngine>,
    pub vector: Arc<dyn VectorEngine>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub generator: Arc<dyn GenerativeProvider>,
    pub language: Language,
}

impl ServiceHandles {
    pub fn new(
        lexical: Arc<dyn LexicalEngine>,
        vector: Arc<dyn VectorEngine>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerativeProvider>,
        language: Language,
    ) -> Self {
        Self {
            lexical,
            vector,
            embedder,
            generator,
            language,
        }
    }

    /// Connect the configured Solr, Milvus, embedder and generator.
    ///
    /// No network call is made here; unreachable services surface per request.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            lexical: Arc::new(SolrClient::new(config.solr.clone())?),
            vector: Arc::new(MilvusClient::new(config.milvus.clone())?),
            embedder: embed::from_config(&config.embedding)?,
            generator: llm::from_config(&config.llm)?,
            language: config.corpus.language,
        })
    }
}

/// Incoming question. `backend` and `k` are validated by [`QueryRequest::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub backend: String,
    pub k: i64,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidQuery {
    pub query: String,
    pub backend: Backend,
    pub k: usize,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, backend: impl Into<String>, k: i64) -> Self {
        Self {
            query: query.into(),
            backend: backend.into(),
            k,
        }
    }

    /// Reject unknown backends, non-positive `k` and blank queries.
    pub fn validate(&self) -> Result<ValidQuery> {
        let backend: Backend = self.backend.parse()?;
        if self.k <= 0 {
            return Err(RagError::InvalidInput(format!(
                "k must be greater than 0, got {}",
                self.k
            )));
        }
        let k = usize::try_from(self.k)
            .map_err(|_| RagError::InvalidInput(format!("k out of range: {}", self.k)))?;
        if self.query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }
        Ok(ValidQuery {
            query: self.query.clone(),
            backend,
            k,
        })
    }
}

/// A source passage as shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub content: String,
    pub source_file: String,
}

/// Response to a [`QueryRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub outcome: OutcomeKind,
    pub source_documents: Vec<SourceDocument>,
    pub retrieval_latency_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_error: Option<String>,
}

/// Everything one request produced, for callers that need more than the response.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub retrieval: RetrievalResult,
    pub outcome: AnswerOutcome,
    /// Retrieval plus generation.
    pub total_latency: Duration,
}

/// Retrieve-then-generate over shared handles.
#[derive(Clone)]
pub struct RagPipeline {
    handles: Arc<ServiceHandles>,
}

impl RagPipeline {
    pub fn new(handles: Arc<ServiceHandles>) -> Self {
        Self { handles }
    }

    pub fn handles(&self) -> &ServiceHandles {
        &self.handles
    }

    /// Run one query through retrieval and answer assembly.
    pub async fn run(&self, backend: Backend, query: &str, k: usize) -> PipelineRun {
        let start = Instant::now();
        let retrieval = retrieve(&self.handles, backend, query, k).await;
        let outcome = assemble(
            self.handles.generator.as_ref(),
            self.handles.language,
            query,
            &retrieval.passages,
        )
        .await;

        PipelineRun {
            retrieval,
            outcome,
            total_latency: start.elapsed(),
        }
    }

    /// Validate and answer a request.
    pub async fn ask(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let query = request.validate()?;
        tracing::info!(backend = %query.backend, k = query.k, "answering query");

        let run = self.run(query.backend, &query.query, query.k).await;

        Ok(QueryResponse {
            answer: run.outcome.display_text(self.handles.language),
            outcome: run.outcome.kind(),
            source_documents: run
                .retrieval
                .passages
                .iter()
                .map(|p| SourceDocument {
                    id: p.id.clone(),
                    content: p.content.clone(),
                    source_file: p.source_file.clone(),
                })
                .collect(),
            retrieval_latency_seconds: run.retrieval.latency.as_secs_f64(),
            retrieval_error: run.retrieval.error,
        })
    }
}
