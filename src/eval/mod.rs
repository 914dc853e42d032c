//! Evaluation of lexical vs. vector retrieval.
//!
//! This module provides:
//! - Gold-standard loading and label checks
//! - Recall@k, MRR@k and ROUGE-L metrics
//! - A concurrent harness producing one record per (query, backend)
//! - CSV and JSON report writers

pub mod gold;
pub mod harness;
pub mod metrics;
pub mod report;

pub use gold::{GoldQuery, load_gold, verify_against_chunks};
pub use harness::{
    BackendSummary, ERROR_LATENCY, EvalOptions, EvaluationRecord, EvaluationReport, Evaluator,
    summarize,
};
pub use metrics::{RougeScorer, mrr_at_k, recall_at_k};
pub use report::{write_json, write_records_csv, write_summary_csv};
