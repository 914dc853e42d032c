//! rag-compare CLI
//!
//! Chunk a corpus, index it into Solr and Milvus, ask questions against either
//! backend and export thesaurus synonyms for Solr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rag_compare::{
    Backend, Config, CorpusIndexer, EmbeddingProvider, GenerativeProvider, MilvusSink,
    QueryRequest, RagPipeline, ServiceHandles,
    backend::{LexicalEngine, MilvusClient, SolrClient, VectorEngine, parse_backends},
    document::load_corpus,
    embed,
    indexer::{ChunkSink, IndexerOptions},
    llm,
    persistence::{export_chunks_csv, load_chunks, save_chunks},
    segment::Segmenter,
    synonyms::{load_thesaurus, write_synonyms},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Lexical vs. vector retrieval for grounded question answering
#[derive(Parser)]
#[command(name = "rag-compare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the corpus into sentence-window chunks
    Chunk {
        /// Directory with the corpus text files
        #[arg(default_value = "data/corpus")]
        corpus: PathBuf,

        /// Output path for the chunk table (.json or .bin)
        #[arg(short, long, default_value = "data/chunks.json")]
        output: PathBuf,

        /// Also write a CSV table for inspection
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Load the chunk table into Solr and Milvus
    Index {
        /// Path to the chunk table
        #[arg(default_value = "data/chunks.json")]
        chunks: PathBuf,

        /// Backends to index, comma separated
        #[arg(short, long, default_value = "lexical,vector")]
        backends: String,

        /// Seconds to wait for each engine to come up
        #[arg(long, default_value_t = 120)]
        ready_timeout_secs: u64,
    },

    /// Answer a question from retrieved passages
    Ask {
        /// The question
        query: String,

        /// lexical (solr) or vector (milvus)
        #[arg(short, long, default_value = "vector")]
        backend: String,

        /// Number of passages to retrieve
        #[arg(short, default_value_t = 5)]
        k: i64,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export Solr synonyms from a SKOS thesaurus
    Synonyms {
        /// RDF/XML thesaurus
        #[arg(default_value = "data/resource-tesauro.rdf")]
        thesaurus: PathBuf,

        /// Output synonyms file
        #[arg(short, long, default_value = "solr/conf/synonyms.txt")]
        output: PathBuf,
    },

    /// Check connectivity to every service
    Test,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Chunk {
            corpus,
            output,
            csv,
        } => cmd_chunk(config_path, &corpus, &output, csv.as_deref()),
        Commands::Index {
            chunks,
            backends,
            ready_timeout_secs,
        } => cmd_index(config_path, &chunks, &backends, ready_timeout_secs).await,
        Commands::Ask {
            query,
            backend,
            k,
            json,
        } => cmd_ask(config_path, query, backend, k, json).await,
        Commands::Synonyms { thesaurus, output } => cmd_synonyms(&thesaurus, &output),
        Commands::Test => cmd_test(config_path).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("Failed to load configuration")
}

fn cmd_chunk(
    config_path: Option<&Path>,
    corpus: &Path,
    output: &Path,
    csv: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let options = config.corpus.chunk_options().context("Invalid chunk options")?;

    println!("Loading corpus from {}", corpus.display());
    let documents =
        load_corpus(corpus, &config.corpus.extension).context("Failed to load corpus")?;

    let start = Instant::now();
    let segmenter = Segmenter::new(options, config.corpus.language);
    let chunks = segmenter
        .segment_corpus(&documents)
        .context("Failed to segment corpus")?;

    println!("\nChunk Table Built:");
    println!("  Documents:   {}", documents.len());
    println!("  Chunks:      {}", chunks.len());
    println!(
        "  Window:      {} sentences, {} overlap",
        options.chunk_size(),
        options.overlap()
    );
    println!("  Time:        {:.2?}", start.elapsed());

    save_chunks(&chunks, output).context("Failed to save chunk table")?;
    println!("\nChunks saved to: {}", output.display());

    if let Some(csv) = csv {
        export_chunks_csv(&chunks, csv).context("Failed to export CSV")?;
        println!("CSV written to:  {}", csv.display());
    }

    Ok(())
}

async fn cmd_index(
    config_path: Option<&Path>,
    chunks_path: &Path,
    backends: &str,
    ready_timeout_secs: u64,
) -> Result<()> {
    let config = load_config(config_path)?;
    let backends = parse_backends(backends)?;

    let chunks = load_chunks(chunks_path).with_context(|| {
        format!(
            "Failed to load chunk table '{}'. Run 'chunk' first.",
            chunks_path.display()
        )
    })?;
    println!("Loaded {} chunks from {}", chunks.len(), chunks_path.display());

    let mut sinks: Vec<Box<dyn ChunkSink>> = Vec::new();
    for backend in &backends {
        match backend {
            Backend::Lexical => {
                sinks.push(Box::new(SolrClient::new(config.solr.clone())?));
            }
            Backend::Vector => {
                let embedder = embed::from_config(&config.embedding)?;
                let client = MilvusClient::new(config.milvus.clone())?;
                sinks.push(Box::new(MilvusSink::new(client, embedder)));
            }
        }
    }

    let options = IndexerOptions {
        ready_timeout: Duration::from_secs(ready_timeout_secs),
        show_progress: true,
        ..Default::default()
    };
    let reports = CorpusIndexer::with_options(sinks, options).index(&chunks).await;

    println!("\nIndexing Summary:");
    for report in &reports {
        match &report.error {
            None => println!("  {:8} {} chunks", report.sink, report.indexed),
            Some(e) => println!(
                "  {:8} FAILED after {} chunks: {}",
                report.sink, report.indexed, e
            ),
        }
    }

    if reports.iter().any(|r| !r.is_ok()) {
        anyhow::bail!("indexing failed for at least one backend");
    }
    Ok(())
}

async fn cmd_ask(
    config_path: Option<&Path>,
    query: String,
    backend: String,
    k: i64,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate().context("Invalid configuration")?;

    let handles = ServiceHandles::from_config(&config)?;
    let pipeline = RagPipeline::new(Arc::new(handles));

    let request = QueryRequest::new(query, backend, k);
    let response = pipeline.ask(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", response.answer);
    println!();
    println!("{}", "─".repeat(60));
    println!(
        "Outcome: {}  |  retrieval {:.3}s",
        response.outcome, response.retrieval_latency_seconds
    );
    if let Some(e) = &response.retrieval_error {
        println!("Retrieval error: {}", e);
    }
    for (i, doc) in response.source_documents.iter().enumerate() {
        let preview: String = doc.content.chars().take(160).collect();
        println!("{:>2}. [{}] {}", i + 1, doc.id, doc.source_file);
        println!("    {}", preview);
    }

    Ok(())
}

fn cmd_synonyms(thesaurus: &Path, output: &Path) -> Result<()> {
    println!("Loading thesaurus from {}", thesaurus.display());
    let groups = load_thesaurus(thesaurus).context("Failed to parse thesaurus")?;
    write_synonyms(&groups, output).context("Failed to write synonyms")?;

    println!("Wrote {} synonym groups to {}", groups.len(), output.display());
    for group in groups.iter().take(10) {
        println!("  {}", group.to_solr_line());
    }
    Ok(())
}

async fn cmd_test(config_path: Option<&Path>) -> Result<()> {
    println!("Testing service connections...\n");

    let config = load_config(config_path)?;

    println!("Configuration:");
    println!("  Solr:       {}", config.solr.core_url());
    println!("  Milvus:     {} ({})", config.milvus.base_url(), config.milvus.collection);
    println!("  Embeddings: {:?} {}", config.embedding.provider, config.embedding.model);
    println!("  LLM:        {:?} {}", config.llm.provider, config.llm.model);
    println!();

    let solr = SolrClient::new(config.solr.clone())?;
    report("Solr", LexicalEngine::ping(&solr).await);

    let milvus = MilvusClient::new(config.milvus.clone())?;
    report("Milvus", VectorEngine::ping(&milvus).await);

    match embed::from_config(&config.embedding) {
        Ok(embedder) => {
            let result = embedder.embed("prueba de conexión").await.map(|v| {
                println!("  Embedding dimension: {}", v.len());
            });
            report("Embeddings", result);
        }
        Err(e) => report("Embeddings", Err(e)),
    }

    if let Err(e) = config.validate() {
        println!("LLM:        skipped ({})", e);
        return Ok(());
    }
    match llm::from_config(&config.llm) {
        Ok(generator) => {
            let result = generator.generate("Responde solo con: OK").await.map(|_| ());
            report("LLM", result);
        }
        Err(e) => report("LLM", Err(e)),
    }

    Ok(())
}

fn report(service: &str, result: rag_compare::Result<()>) {
    match result {
        Ok(()) => println!("{:11} ok", format!("{}:", service)),
        Err(e) => println!("{:11} FAILED ({})", format!("{}:", service), e),
    }
}
