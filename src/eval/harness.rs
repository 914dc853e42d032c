//! Evaluation harness.
//!
//! Every (gold query, backend) pair runs through the query pipeline independently, at
//! most `concurrency` at a time. Scoring and aggregation start only once every pair has
//! finished, and records come back in (query, backend) order whatever order the pairs
//! completed in.

use super::gold::GoldQuery;
use super::metrics::{RougeScorer, mrr_at_k, recall_at_k};
use crate::answer::OutcomeKind;
use crate::backend::Backend;
use crate::config::EvalConfig;
use crate::error::{RagError, Result};
use crate::service::{PipelineRun, RagPipeline};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Latency recorded for pairs that produced no measurement.
pub const ERROR_LATENCY: f64 = -1.0;

/// Harness parameters.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Metric cut-off and number of passages retrieved.
    pub k: usize,
    /// Pairs in flight at once.
    pub concurrency: usize,
    /// Budget for one pair, retrieval and generation together.
    pub pair_timeout: Duration,
    /// Show a progress bar on stderr.
    pub show_progress: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self::from(&EvalConfig::default())
    }
}

impl From<&EvalConfig> for EvalOptions {
    fn from(config: &EvalConfig) -> Self {
        Self {
            k: config.k,
            concurrency: config.concurrency,
            pair_timeout: Duration::from_secs(config.pair_timeout_secs),
            show_progress: false,
        }
    }
}

/// Scores for one (query, backend) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub query: String,
    pub backend: Backend,
    /// Seconds, or [`ERROR_LATENCY`].
    pub retrieval_latency: f64,
    /// Seconds, or [`ERROR_LATENCY`].
    pub total_latency: f64,
    pub recall_at_k: f64,
    pub mrr_at_k: f64,
    pub rouge_l_f1: f64,
    pub retrieved_ids: Vec<String>,
    pub relevant_ids: Vec<String>,
    pub generated_answer: String,
    pub outcome: OutcomeKind,
    pub error: Option<String>,
}

impl EvaluationRecord {
    fn error_sample(gold: &GoldQuery, backend: Backend, detail: String) -> Self {
        Self {
            query: gold.query.clone(),
            backend,
            retrieval_latency: ERROR_LATENCY,
            total_latency: ERROR_LATENCY,
            recall_at_k: 0.0,
            mrr_at_k: 0.0,
            rouge_l_f1: 0.0,
            retrieved_ids: Vec::new(),
            relevant_ids: gold.relevant_chunk_ids.clone(),
            generated_answer: format!("ERROR: {}", detail),
            outcome: OutcomeKind::Error,
            error: Some(detail),
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome == OutcomeKind::Error
    }
}

/// Per-backend aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSummary {
    pub backend: Backend,
    pub records: usize,
    pub errors: usize,
    /// Records whose gold query had no relevant chunk.
    pub unlabeled: usize,
    pub mean_recall_at_k: f64,
    pub mean_mrr_at_k: f64,
    pub mean_rouge_l_f1: f64,
    /// Over non-error records; 0.0 when there are none.
    pub mean_retrieval_latency: f64,
    pub mean_total_latency: f64,
    pub outcomes: BTreeMap<OutcomeKind, usize>,
}

/// A finished evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub k: usize,
    pub records: Vec<EvaluationRecord>,
    pub summaries: Vec<BackendSummary>,
    pub total_time_secs: f64,
}

impl EvaluationReport {
    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("\n========== Evaluation Results (k = {}) ==========", self.k);
        println!(
            "{:<10} {:>8} {:>8} {:>10} {:>12} {:>12} {:>7}",
            "backend", "recall", "mrr", "rouge_l", "retrieval_s", "total_s", "errors"
        );
        println!("-------------------------------------------------------------------------");
        for s in &self.summaries {
            println!(
                "{:<10} {:>8.4} {:>8.4} {:>10.4} {:>12.4} {:>12.4} {:>7}",
                s.backend.as_str(),
                s.mean_recall_at_k,
                s.mean_mrr_at_k,
                s.mean_rouge_l_f1,
                s.mean_retrieval_latency,
                s.mean_total_latency,
                s.errors
            );
        }
        println!("-------------------------------------------------------------------------");
        for s in &self.summaries {
            let outcomes: Vec<String> = s
                .outcomes
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(kind, count)| format!("{}={}", kind, count))
                .collect();
            println!("{:<10} {}", s.backend.as_str(), outcomes.join(" "));
            if s.unlabeled > 0 {
                println!("{:<10} {} record(s) without relevant chunks", "", s.unlabeled);
            }
        }
        println!("Total time: {:.1}s", self.total_time_secs);
        println!("==========================================================================\n");
    }
}

/// Runs a gold standard against the pipeline.
pub struct Evaluator {
    pipeline: RagPipeline,
    scorer: RougeScorer,
    options: EvalOptions,
}

impl Evaluator {
    pub fn new(pipeline: RagPipeline, options: EvalOptions) -> Result<Self> {
        if options.k == 0 {
            return Err(RagError::InvalidInput("k must be greater than 0".to_string()));
        }
        if options.concurrency == 0 {
            return Err(RagError::InvalidInput(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if options.pair_timeout.is_zero() {
            return Err(RagError::InvalidInput(
                "pair timeout must be greater than 0".to_string(),
            ));
        }
        let scorer = RougeScorer::new(pipeline.handles().language);
        Ok(Self {
            pipeline,
            scorer,
            options,
        })
    }

    /// Evaluate every gold query on every backend. Repeated backends run once.
    pub async fn run(&self, gold: &[GoldQuery], backends: &[Backend]) -> EvaluationReport {
        let start = Instant::now();
        let backends = distinct(backends);
        let records = self.evaluate(gold, &backends).await;
        let summaries = summarize(&records, &backends);

        EvaluationReport {
            k: self.options.k,
            records,
            summaries,
            total_time_secs: start.elapsed().as_secs_f64(),
        }
    }

    /// One record per (query, distinct backend), ordered by query then backend.
    pub async fn evaluate(&self, gold: &[GoldQuery], backends: &[Backend]) -> Vec<EvaluationRecord> {
        let backends = distinct(backends);
        let backends = backends.as_slice();
        let pairs: Vec<(usize, usize)> = (0..gold.len())
            .flat_map(|q| (0..backends.len()).map(move |b| (q, b)))
            .collect();

        tracing::info!(
            queries = gold.len(),
            backends = backends.len(),
            concurrency = self.options.concurrency,
            k = self.options.k,
            "starting evaluation"
        );

        let progress = if self.options.show_progress {
            let pb = ProgressBar::new(pairs.len() as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{bar:40} {pos}/{len} pairs [{elapsed_precise}]")
            {
                pb.set_style(style);
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut results: Vec<(usize, usize, EvaluationRecord)> = stream::iter(pairs)
            .map(|(q, b)| {
                let progress = &progress;
                async move {
                    let record = self.evaluate_pair(&gold[q], backends[b]).await;
                    progress.inc(1);
                    (q, b, record)
                }
            })
            .buffer_unordered(self.options.concurrency)
            .collect()
            .await;

        progress.finish_and_clear();
        results.sort_by_key(|(q, b, _)| (*q, *b));
        results.into_iter().map(|(_, _, record)| record).collect()
    }

    async fn evaluate_pair(&self, gold: &GoldQuery, backend: Backend) -> EvaluationRecord {
        let run = tokio::time::timeout(
            self.options.pair_timeout,
            self.pipeline.run(backend, &gold.query, self.options.k),
        )
        .await;

        match run {
            Err(_) => {
                tracing::warn!(%backend, query = %gold.query, "pair timed out");
                EvaluationRecord::error_sample(
                    gold,
                    backend,
                    format!("timed out after {:?}", self.options.pair_timeout),
                )
            }
            Ok(run) => match run.retrieval.error.clone() {
                Some(error) => EvaluationRecord::error_sample(gold, backend, error),
                None => self.score(gold, backend, run),
            },
        }
    }

    fn score(&self, gold: &GoldQuery, backend: Backend, run: PipelineRun) -> EvaluationRecord {
        let k = self.options.k;
        let retrieved = run.retrieval.ids();
        let relevant = &gold.relevant_chunk_ids;

        let rouge_l_f1 = match run.outcome.answer_text() {
            Some(answer) => self.scorer.rouge_l_f1(answer, &gold.ideal_answer),
            None => 0.0,
        };
        let language = self.pipeline.handles().language;

        EvaluationRecord {
            query: gold.query.clone(),
            backend,
            retrieval_latency: run.retrieval.latency.as_secs_f64(),
            total_latency: run.total_latency.as_secs_f64(),
            recall_at_k: recall_at_k(&retrieved, relevant, k),
            mrr_at_k: mrr_at_k(&retrieved, relevant, k),
            rouge_l_f1,
            retrieved_ids: retrieved,
            relevant_ids: relevant.clone(),
            generated_answer: run.outcome.display_text(language),
            outcome: run.outcome.kind(),
            error: None,
        }
    }
}

/// First occurrence of each backend, in order.
fn distinct(backends: &[Backend]) -> Vec<Backend> {
    let mut out = Vec::with_capacity(backends.len());
    for &backend in backends {
        if !out.contains(&backend) {
            out.push(backend);
        }
    }
    out
}

/// Aggregate records per backend, in `backends` order.
pub fn summarize(records: &[EvaluationRecord], backends: &[Backend]) -> Vec<BackendSummary> {
    backends
        .iter()
        .map(|&backend| {
            let rows: Vec<&EvaluationRecord> =
                records.iter().filter(|r| r.backend == backend).collect();
            let ok: Vec<&EvaluationRecord> = rows.iter().copied().filter(|r| !r.is_error()).collect();

            let mut outcomes: BTreeMap<OutcomeKind, usize> =
                OutcomeKind::ALL.iter().map(|kind| (*kind, 0)).collect();
            for row in &rows {
                *outcomes.entry(row.outcome).or_insert(0) += 1;
            }

            BackendSummary {
                backend,
                records: rows.len(),
                errors: rows.len() - ok.len(),
                unlabeled: rows.iter().filter(|r| r.relevant_ids.is_empty()).count(),
                mean_recall_at_k: mean(rows.iter().map(|r| r.recall_at_k)),
                mean_mrr_at_k: mean(rows.iter().map(|r| r.mrr_at_k)),
                mean_rouge_l_f1: mean(rows.iter().map(|r| r.rouge_l_f1)),
                mean_retrieval_latency: mean(ok.iter().map(|r| r.retrieval_latency)),
                mean_total_latency: mean(ok.iter().map(|r| r.total_latency)),
                outcomes,
            }
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}
