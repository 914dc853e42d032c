//! Corpus indexer - pushes the chunk table into both search engines.
//!
//! Each engine is a [`ChunkSink`]. For every sink the indexer:
//! 1. Waits until the sink answers (polling, bounded)
//! 2. Prepares it (e.g. creates the Milvus collection)
//! 3. Writes the chunks in sink-sized batches
//! 4. Finishes it (e.g. loads the collection)
//!
//! A failing sink is reported and the next one still runs.

use crate::backend::{MilvusClient, SolrClient};
use crate::embed::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::segment::Chunk;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A destination for chunks.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Chunks per write.
    fn batch_size(&self) -> usize;

    /// Succeeds once the sink accepts requests.
    async fn ready(&self) -> Result<()>;

    /// Called once before the first batch.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    async fn write_batch(&self, chunks: &[Chunk]) -> Result<()>;

    /// Called once after the last batch.
    async fn finish(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ChunkSink for SolrClient {
    fn name(&self) -> &str {
        "solr"
    }

    fn batch_size(&self) -> usize {
        self.config().batch_size
    }

    async fn ready(&self) -> Result<()> {
        self.ping_core().await
    }

    async fn write_batch(&self, chunks: &[Chunk]) -> Result<()> {
        self.add_chunks(chunks).await
    }
}

/// Milvus plus the embedder that turns chunk text into vectors.
pub struct MilvusSink {
    client: MilvusClient,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl MilvusSink {
    pub fn new(client: MilvusClient, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { client, embedder }
    }
}

#[async_trait]
impl ChunkSink for MilvusSink {
    fn name(&self) -> &str {
        "milvus"
    }

    fn batch_size(&self) -> usize {
        self.client.config().batch_size
    }

    async fn ready(&self) -> Result<()> {
        self.client.has_collection().await.map(|_| ())
    }

    async fn prepare(&self) -> Result<()> {
        if self.client.has_collection().await? {
            tracing::info!(collection = %self.client.config().collection, "milvus collection exists");
            return Ok(());
        }
        self.client.create_collection(self.embedder.dimension()).await
    }

    async fn write_batch(&self, chunks: &[Chunk]) -> Result<()> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::backend(
                "embedding",
                format!("{} vectors for {} chunks", vectors.len(), chunks.len()),
            ));
        }

        let rows: Vec<(String, String, String, Vec<f32>)> = chunks
            .iter()
            .zip(vectors)
            .map(|(c, v)| {
                (
                    c.chunk_id.clone(),
                    c.text.clone(),
                    c.source_document.clone(),
                    v,
                )
            })
            .collect();
        self.client.insert(&rows).await
    }

    async fn finish(&self) -> Result<()> {
        self.client.load_collection().await
    }
}

/// Options for corpus indexing.
#[derive(Debug, Clone)]
pub struct IndexerOptions {
    /// How long to wait for a sink to come up.
    pub ready_timeout: Duration,
    /// Pause between readiness probes.
    pub poll_interval: Duration,
    /// Show a progress bar per sink.
    pub show_progress: bool,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(5),
            show_progress: false,
        }
    }
}

/// What happened to one sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkReport {
    pub sink: String,
    pub indexed: usize,
    pub error: Option<String>,
}

impl SinkReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Feeds a chunk table into every sink.
pub struct CorpusIndexer {
    sinks: Vec<Box<dyn ChunkSink>>,
    options: IndexerOptions,
}

impl CorpusIndexer {
    /// Create a new indexer.
    pub fn new(sinks: Vec<Box<dyn ChunkSink>>) -> Self {
        Self {
            sinks,
            options: IndexerOptions::default(),
        }
    }

    /// Create with custom options.
    pub fn with_options(sinks: Vec<Box<dyn ChunkSink>>, options: IndexerOptions) -> Self {
        Self { sinks, options }
    }

    /// Index `chunks` into every sink, one sink after the other.
    pub async fn index(&self, chunks: &[Chunk]) -> Vec<SinkReport> {
        let mut reports = Vec::with_capacity(self.sinks.len());

        for sink in &self.sinks {
            let mut indexed = 0;
            let result = self.index_into(sink.as_ref(), chunks, &mut indexed).await;

            let error = match result {
                Ok(()) => {
                    tracing::info!(sink = sink.name(), chunks = indexed, "indexing finished");
                    None
                }
                Err(e) => {
                    tracing::error!(sink = sink.name(), indexed, error = %e, "indexing failed");
                    Some(e.to_string())
                }
            };
            reports.push(SinkReport {
                sink: sink.name().to_string(),
                indexed,
                error,
            });
        }

        reports
    }

    async fn index_into(
        &self,
        sink: &dyn ChunkSink,
        chunks: &[Chunk],
        indexed: &mut usize,
    ) -> Result<()> {
        wait_until_ready(sink, &self.options).await?;
        sink.prepare().await?;

        let progress = if self.options.show_progress {
            let pb = ProgressBar::new(chunks.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{msg:8} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb.set_message(sink.name().to_string());
            pb
        } else {
            ProgressBar::hidden()
        };

        for batch in chunks.chunks(sink.batch_size().max(1)) {
            sink.write_batch(batch).await?;
            *indexed += batch.len();
            progress.inc(batch.len() as u64);
        }
        progress.finish_and_clear();

        sink.finish().await
    }
}

/// Poll `sink.ready()` until it succeeds or the budget runs out.
pub async fn wait_until_ready(sink: &dyn ChunkSink, options: &IndexerOptions) -> Result<()> {
    let start = Instant::now();
    loop {
        match sink.ready().await {
            Ok(()) => {
                tracing::info!(sink = sink.name(), "sink reachable");
                return Ok(());
            }
            Err(e) if start.elapsed() + options.poll_interval > options.ready_timeout => {
                return Err(RagError::backend(
                    sink.name(),
                    format!("not ready after {:?}: {}", options.ready_timeout, e),
                ));
            }
            Err(e) => {
                tracing::info!(sink = sink.name(), error = %e, "waiting for sink");
                tokio::time::sleep(options.poll_interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubEmbedder;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingSink {
        name: String,
        batch_size: usize,
        ready_after: usize,
        fail_on_batch: Option<usize>,
        probes: AtomicUsize,
        batches: Mutex<Vec<Vec<String>>>,
        finished: AtomicUsize,
    }

    impl RecordingSink {
        fn new(name: &str, batch_size: usize) -> Self {
            Self {
                name: name.to_string(),
                batch_size,
                ready_after: 0,
                fail_on_batch: None,
                probes: AtomicUsize::new(0),
                batches: Mutex::new(Vec::new()),
                finished: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChunkSink for Arc<RecordingSink> {
        fn name(&self) -> &str {
            &self.name
        }

        fn batch_size(&self) -> usize {
            self.batch_size
        }

        async fn ready(&self) -> Result<()> {
            let probe = self.probes.fetch_add(1, Ordering::SeqCst);
            if probe < self.ready_after {
                Err(RagError::backend(&self.name, "starting"))
            } else {
                Ok(())
            }
        }

        async fn write_batch(&self, chunks: &[Chunk]) -> Result<()> {
            let mut batches = self.batches.lock().unwrap();
            if Some(batches.len()) == self.fail_on_batch {
                return Err(RagError::backend(&self.name, "disk full"));
            }
            batches.push(chunks.iter().map(|c| c.chunk_id.clone()).collect());
            Ok(())
        }

        async fn finish(&self) -> Result<()> {
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk {
                chunk_id: crate::segment::chunk_id("a.txt", i),
                text: format!("Frase {}.", i),
                source_document: "a.txt".to_string(),
            })
            .collect()
    }

    fn fast_options() -> IndexerOptions {
        IndexerOptions {
            ready_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
            show_progress: false,
        }
    }

    #[tokio::test]
    async fn test_batches_follow_sink_size() {
        let sink = Arc::new(RecordingSink::new("solr", 2));
        let indexer = CorpusIndexer::with_options(vec![Box::new(sink.clone())], fast_options());

        let reports = indexer.index(&chunks(5)).await;
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_ok());
        assert_eq!(reports[0].indexed, 5);

        let sizes: Vec<usize> = sink.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(sink.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_the_next() {
        let mut broken = RecordingSink::new("solr", 2);
        broken.fail_on_batch = Some(1);
        let broken = Arc::new(broken);
        let healthy = Arc::new(RecordingSink::new("milvus", 10));

        let indexer = CorpusIndexer::with_options(
            vec![Box::new(broken.clone()), Box::new(healthy.clone())],
            fast_options(),
        );
        let reports = indexer.index(&chunks(5)).await;

        assert_eq!(reports[0].sink, "solr");
        assert_eq!(reports[0].indexed, 2);
        assert!(reports[0].error.as_deref().unwrap().contains("disk full"));
        assert_eq!(broken.finished.load(Ordering::SeqCst), 0);

        assert!(reports[1].is_ok());
        assert_eq!(reports[1].indexed, 5);
    }

    #[tokio::test]
    async fn test_waits_for_slow_sink() {
        let mut sink = RecordingSink::new("milvus", 10);
        sink.ready_after = 3;
        let sink = Arc::new(sink);

        wait_until_ready(&sink, &fast_options()).await.unwrap();
        assert_eq!(sink.probes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_ready_timeout() {
        let mut sink = RecordingSink::new("solr", 10);
        sink.ready_after = usize::MAX;
        let sink = Arc::new(sink);

        let options = IndexerOptions {
            ready_timeout: Duration::from_millis(30),
            ..fast_options()
        };
        let err = wait_until_ready(&sink, &options).await.unwrap_err();
        assert!(err.to_string().contains("not ready"));
    }

    #[test]
    fn test_milvus_sink_reports_embedder_dimension() {
        let client = MilvusClient::new(crate::config::MilvusConfig::default()).unwrap();
        let sink = MilvusSink::new(client, Arc::new(StubEmbedder::new(384)));
        assert_eq!(sink.name(), "milvus");
        assert_eq!(sink.batch_size(), 100);
        assert_eq!(sink.embedder.dimension(), 384);
    }
}
