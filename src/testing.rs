//! In-crate stubs for the four external collaborators.

use crate::backend::{LexicalEngine, SearchHit, VectorEngine};
use crate::embed::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::language::Language;
use crate::llm::{Generation, GenerativeProvider};
use crate::service::ServiceHandles;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn hit(id: &str) -> SearchHit {
    let source = id.rsplit_once('_').map(|(doc, _)| doc).unwrap_or(id);
    SearchHit {
        id: id.to_string(),
        content: format!("Contenido de {}.", id),
        source_file: source.to_string(),
        score: None,
    }
}

pub fn hits(ids: &[&str]) -> Vec<SearchHit> {
    ids.iter().map(|id| hit(id)).collect()
}

/// Search engine stub serving fixed hits or a fixed error.
pub struct StubEngine {
    hits: std::result::Result<Vec<SearchHit>, String>,
    pub calls: AtomicUsize,
    pub last_limit: AtomicUsize,
}

impl StubEngine {
    pub fn with_hits(ids: &[&str]) -> Self {
        Self {
            hits: Ok(hits(ids)),
            calls: AtomicUsize::new(0),
            last_limit: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            hits: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_limit: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, limit: usize) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(limit, Ordering::SeqCst);
        match &self.hits {
            Ok(hits) => Ok(hits.iter().take(limit).cloned().collect()),
            Err(message) => Err(RagError::backend("stub", message)),
        }
    }
}

#[async_trait]
impl LexicalEngine for StubEngine {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.respond(limit)
    }
}

#[async_trait]
impl VectorEngine for StubEngine {
    async fn search(&self, _vector: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        self.respond(limit)
    }
}

/// Embedder stub returning a constant vector, optionally after a delay.
pub struct StubEmbedder {
    dimension: usize,
    fail: bool,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(4)
        }
    }

    pub fn slow(dimension: usize, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(dimension)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RagError::backend("embedding", "model offline"));
        }
        Ok(vec![0.5; self.dimension])
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Generator stub returning a fixed generation, optionally after a delay.
pub struct StubGenerator {
    response: std::result::Result<Generation, String>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
}

impl StubGenerator {
    pub fn answering(text: &str) -> Self {
        Self::returning(Generation::text(text))
    }

    pub fn returning(generation: Generation) -> Self {
        Self {
            response: Ok(generation),
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            ..Self::answering("")
        }
    }

    pub fn slow(text: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::answering(text)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeProvider for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.response {
            Ok(generation) => Ok(generation.clone()),
            Err(message) => Err(RagError::LlmApi(message.clone())),
        }
    }

    fn model(&self) -> &str {
        "stub"
    }
}

/// Handles wired to the given stubs, Spanish corpus.
pub fn handles(
    lexical: Arc<StubEngine>,
    vector: Arc<StubEngine>,
    embedder: Arc<StubEmbedder>,
    generator: Arc<StubGenerator>,
) -> ServiceHandles {
    ServiceHandles::new(lexical, vector, embedder, generator, Language::Spanish)
}
