//! Evaluation CLI: lexical vs. vector retrieval against a gold standard.
//!
//! Usage:
//!   eval                                  # reports/gold_standard.json, both backends
//!   eval --gold <path> -k 10              # custom gold file and cut-off
//!   eval --backends solr                  # one backend only
//!   eval --chunks data/chunks.json        # check gold ids against the chunk table first
//!
//! Options:
//!   --max-items <N>          # Limit number of gold queries
//!   --concurrency <N>        # Pairs in flight at once
//!   --timeout-secs <N>       # Budget for one (query, backend) pair
//!   --output <path>          # Per-record CSV
//!   --summary <path>         # Per-backend CSV
//!   --json <path>            # Full report as JSON

use anyhow::{Context, Result};
use clap::Parser;
use rag_compare::backend::parse_backends;
use rag_compare::config::Config;
use rag_compare::eval::{
    EvalOptions, Evaluator, load_gold, verify_against_chunks, write_json, write_records_csv,
    write_summary_csv,
};
use rag_compare::persistence::load_chunks;
use rag_compare::{RagPipeline, ServiceHandles};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eval")]
#[command(about = "Evaluate lexical vs. vector retrieval for RAG", long_about = None)]
struct Cli {
    /// Gold standard JSON file
    #[arg(long, default_value = "reports/gold_standard.json")]
    gold: PathBuf,

    /// Backends to evaluate, comma separated
    #[arg(short, long, default_value = "lexical,vector")]
    backends: String,

    /// Metric cut-off and passages retrieved (defaults to config)
    #[arg(short)]
    k: Option<usize>,

    /// Pairs evaluated concurrently (defaults to config)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Timeout for one (query, backend) pair in seconds (defaults to config)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Maximum number of gold queries to evaluate
    #[arg(long)]
    max_items: Option<usize>,

    /// Chunk table to verify gold ids against
    #[arg(long)]
    chunks: Option<PathBuf>,

    /// Per-record CSV output
    #[arg(short, long, default_value = "reports/evaluation_results.csv")]
    output: PathBuf,

    /// Per-backend summary CSV output
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Full report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Path to a YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    let backends = parse_backends(&cli.backends)?;

    println!("LLM:      {:?} {}", config.llm.provider, config.llm.model);
    println!("Backends: {}", cli.backends);

    let mut gold = load_gold(&cli.gold)
        .with_context(|| format!("Failed to load gold standard '{}'", cli.gold.display()))?;
    if let Some(max) = cli.max_items {
        gold.truncate(max);
    }
    println!("Gold:     {} ({} queries)", cli.gold.display(), gold.len());

    if let Some(chunks_path) = &cli.chunks {
        let chunks = load_chunks(chunks_path).context("Failed to load chunk table")?;
        verify_against_chunks(&gold, &chunks).context("Gold standard does not match chunks")?;
        println!("Gold ids verified against {} chunks", chunks.len());
    }

    let mut options = EvalOptions::from(&config.eval);
    if let Some(k) = cli.k {
        options.k = k;
    }
    if let Some(concurrency) = cli.concurrency {
        options.concurrency = concurrency;
    }
    if let Some(secs) = cli.timeout_secs {
        options.pair_timeout = Duration::from_secs(secs);
    }
    options.show_progress = !cli.quiet;

    let handles = ServiceHandles::from_config(&config)?;
    let evaluator = Evaluator::new(RagPipeline::new(Arc::new(handles)), options)?;
    let report = evaluator.run(&gold, &backends).await;

    report.print_summary();

    write_records_csv(&report.records, &cli.output)?;
    println!("Records saved to {}", cli.output.display());

    if let Some(path) = &cli.summary {
        write_summary_csv(&report.summaries, path)?;
        println!("Summary saved to {}", path.display());
    }
    if let Some(path) = &cli.json {
        write_json(&report, path)?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}
