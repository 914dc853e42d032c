//! Backend-agnostic retrieval.
//!
//! [`retrieve`] is the only place that knows how each [`Backend`] is queried. It never
//! returns an error: a failed call produces an empty [`RetrievalResult`] with `error`
//! set, so one unhealthy engine cannot take down a request or an evaluation run.

use crate::backend::{Backend, SearchHit};
use crate::error::{RagError, Result};
use crate::service::ServiceHandles;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// A retrieved chunk with its 1-based position in the engine's ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub id: String,
    pub content: String,
    pub source_file: String,
    pub rank: usize,
}

/// Outcome of one retrieval call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    /// Ascending rank, unique ids.
    pub passages: Vec<RetrievedPassage>,
    /// Time spent in the search call.
    pub latency: Duration,
    /// Time spent embedding the query (vector backend only).
    pub embedding_latency: Option<Duration>,
    /// Set when the backend call failed; `passages` is then empty.
    pub error: Option<String>,
}

impl RetrievalResult {
    fn failed(error: &RagError, embedding_latency: Option<Duration>) -> Self {
        Self {
            error: Some(error.to_string()),
            embedding_latency,
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Passage ids in rank order.
    pub fn ids(&self) -> Vec<String> {
        self.passages.iter().map(|p| p.id.clone()).collect()
    }
}

/// Retrieve up to `k` passages for `query` from `backend`.
pub async fn retrieve(
    handles: &ServiceHandles,
    backend: Backend,
    query: &str,
    k: usize,
) -> RetrievalResult {
    if k == 0 {
        let err = RagError::InvalidInput("k must be greater than 0".to_string());
        tracing::warn!(%backend, error = %err, "retrieval rejected");
        return RetrievalResult::failed(&err, None);
    }

    let mut embedding_latency = None;
    let outcome: Result<(Vec<SearchHit>, Duration)> = match backend {
        Backend::Lexical => {
            let start = Instant::now();
            let hits = handles.lexical.search(query, k).await;
            let latency = start.elapsed();
            hits.map(|h| (h, latency))
        }
        Backend::Vector => {
            let embed_start = Instant::now();
            let vector = handles.embedder.embed(query).await;
            embedding_latency = Some(embed_start.elapsed());

            match vector {
                Ok(vector) => {
                    let start = Instant::now();
                    let hits = handles.vector.search(&vector, k).await;
                    let latency = start.elapsed();
                    hits.map(|h| (h, latency))
                }
                Err(e) => Err(e),
            }
        }
    };

    match outcome {
        Ok((hits, latency)) => {
            let passages = rank_passages(hits);
            tracing::debug!(
                %backend,
                k,
                passages = passages.len(),
                latency_ms = latency.as_millis() as u64,
                "retrieved"
            );
            RetrievalResult {
                passages,
                latency,
                embedding_latency,
                error: None,
            }
        }
        Err(err) => {
            tracing::warn!(%backend, error = %err, "retrieval failed");
            RetrievalResult::failed(&err, embedding_latency)
        }
    }
}

/// Drop repeated ids (first occurrence wins) and number the rest from 1.
pub fn rank_passages(hits: Vec<SearchHit>) -> Vec<RetrievedPassage> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.id.clone()))
        .enumerate()
        .map(|(i, hit)| RetrievedPassage {
            id: hit.id,
            content: hit.content,
            source_file: hit.source_file,
            rank: i + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubEmbedder, StubEngine, StubGenerator, handles, hits};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    struct Fixture {
        lexical: Arc<StubEngine>,
        vector: Arc<StubEngine>,
        embedder: Arc<StubEmbedder>,
        handles: ServiceHandles,
    }

    fn fixture(lexical: StubEngine, vector: StubEngine, embedder: StubEmbedder) -> Fixture {
        let lexical = Arc::new(lexical);
        let vector = Arc::new(vector);
        let embedder = Arc::new(embedder);
        let handles = handles(
            lexical.clone(),
            vector.clone(),
            embedder.clone(),
            Arc::new(StubGenerator::answering("ok")),
        );
        Fixture {
            lexical,
            vector,
            embedder,
            handles,
        }
    }

    #[test]
    fn test_rank_passages_dedupes() {
        let passages = rank_passages(hits(&["a_0000", "b_0000", "a_0000", "c_0001"]));
        let ranked: Vec<_> = passages.iter().map(|p| (p.id.as_str(), p.rank)).collect();
        assert_eq!(ranked, vec![("a_0000", 1), ("b_0000", 2), ("c_0001", 3)]);
        assert_eq!(passages[0].source_file, "a");
    }

    #[tokio::test]
    async fn test_lexical_keeps_engine_order() {
        let f = fixture(
            StubEngine::with_hits(&["d.txt_0003", "d.txt_0001"]),
            StubEngine::with_hits(&[]),
            StubEmbedder::new(4),
        );

        let result = retrieve(&f.handles, Backend::Lexical, "consulta", 5).await;
        assert_eq!(result.ids(), vec!["d.txt_0003", "d.txt_0001"]);
        assert!(result.error.is_none());
        assert!(result.embedding_latency.is_none());
        assert_eq!(f.lexical.last_limit.load(Ordering::SeqCst), 5);
        assert_eq!(f.embedder.calls(), 0);
        assert_eq!(f.vector.calls(), 0);
    }

    #[tokio::test]
    async fn test_vector_embeds_then_searches() {
        let f = fixture(
            StubEngine::with_hits(&[]),
            StubEngine::with_hits(&["a_0000", "b_0000", "c_0000"]),
            StubEmbedder::new(4),
        );

        let result = retrieve(&f.handles, Backend::Vector, "consulta", 2).await;
        assert_eq!(result.ids(), vec!["a_0000", "b_0000"]);
        assert!(result.embedding_latency.is_some());
        assert_eq!(f.embedder.calls(), 1);
        assert_eq!(f.lexical.calls(), 0);
    }

    #[tokio::test]
    async fn test_vector_latency_excludes_embedding() {
        let delay = Duration::from_millis(200);
        let f = fixture(
            StubEngine::with_hits(&[]),
            StubEngine::with_hits(&["a_0000"]),
            StubEmbedder::slow(4, delay),
        );

        let result = retrieve(&f.handles, Backend::Vector, "consulta", 1).await;
        assert_eq!(result.ids(), vec!["a_0000"]);
        assert!(result.embedding_latency.unwrap() >= delay);
        assert!(
            result.latency < Duration::from_millis(100),
            "search latency was {:?}",
            result.latency
        );
    }

    #[tokio::test]
    async fn test_zero_hits_is_not_an_error() {
        let f = fixture(
            StubEngine::with_hits(&[]),
            StubEngine::with_hits(&[]),
            StubEmbedder::new(4),
        );
        let result = retrieve(&f.handles, Backend::Lexical, "nada", 3).await;
        assert!(result.passages.is_empty());
        assert!(!result.is_error());
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_empty_result() {
        let f = fixture(
            StubEngine::failing("connection refused"),
            StubEngine::with_hits(&["a_0000"]),
            StubEmbedder::new(4),
        );
        let result = retrieve(&f.handles, Backend::Lexical, "consulta", 3).await;
        assert!(result.passages.is_empty());
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_vector_search() {
        let f = fixture(
            StubEngine::with_hits(&[]),
            StubEngine::with_hits(&["a_0000"]),
            StubEmbedder::failing(),
        );
        let result = retrieve(&f.handles, Backend::Vector, "consulta", 3).await;
        assert!(result.is_error());
        assert!(result.passages.is_empty());
        assert_eq!(f.vector.calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_k_never_reaches_backend() {
        let f = fixture(
            StubEngine::with_hits(&["a_0000"]),
            StubEngine::with_hits(&[]),
            StubEmbedder::new(4),
        );
        let result = retrieve(&f.handles, Backend::Lexical, "consulta", 0).await;
        assert!(result.is_error());
        assert_eq!(f.lexical.calls(), 0);
    }
}
