//! Report writers: per-record CSV, per-backend summary CSV and full JSON.

use super::harness::{BackendSummary, EvaluationRecord, EvaluationReport};
use crate::answer::OutcomeKind;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Separator for id lists inside one CSV cell.
pub const ID_SEPARATOR: &str = "|";

const RECORD_HEADER: [&str; 12] = [
    "query",
    "backend",
    "total_latency_sec",
    "retrieval_latency_sec",
    "recall_at_k",
    "mrr_at_k",
    "rouge_l_f1",
    "generated_answer",
    "retrieved_ids",
    "relevant_ids",
    "outcome",
    "error",
];

/// Write one row per record.
pub fn write_records_csv(records: &[EvaluationRecord], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(RECORD_HEADER)?;
    for r in records {
        writer.write_record([
            r.query.clone(),
            r.backend.to_string(),
            r.total_latency.to_string(),
            r.retrieval_latency.to_string(),
            r.recall_at_k.to_string(),
            r.mrr_at_k.to_string(),
            r.rouge_l_f1.to_string(),
            r.generated_answer.clone(),
            r.retrieved_ids.join(ID_SEPARATOR),
            r.relevant_ids.join(ID_SEPARATOR),
            r.outcome.to_string(),
            r.error.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = records.len(), "evaluation results written");
    Ok(())
}

/// Write one row per backend with the means and counts.
pub fn write_summary_csv(summaries: &[BackendSummary], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record([
        "backend",
        "records",
        "errors",
        "unlabeled",
        "recall_at_k",
        "mrr_at_k",
        "rouge_l_f1",
        "retrieval_latency_sec",
        "total_latency_sec",
        "answered",
        "refused",
        "no_context",
        "provider_error",
    ])?;
    for s in summaries {
        let count = |kind: OutcomeKind| s.outcomes.get(&kind).copied().unwrap_or(0).to_string();
        writer.write_record([
            s.backend.to_string(),
            s.records.to_string(),
            s.errors.to_string(),
            s.unlabeled.to_string(),
            format!("{:.4}", s.mean_recall_at_k),
            format!("{:.4}", s.mean_mrr_at_k),
            format!("{:.4}", s.mean_rouge_l_f1),
            format!("{:.4}", s.mean_retrieval_latency),
            format!("{:.4}", s.mean_total_latency),
            count(OutcomeKind::Answered),
            count(OutcomeKind::Refused),
            count(OutcomeKind::NoContext),
            count(OutcomeKind::ProviderError),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Save the whole report as pretty JSON.
pub fn write_json(report: &EvaluationReport, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let content = serde_json::to_string_pretty(report)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::eval::harness::summarize;
    use tempfile::TempDir;

    fn record() -> EvaluationRecord {
        EvaluationRecord {
            query: "¿Dónde, exactamente?".to_string(),
            backend: Backend::Vector,
            retrieval_latency: 0.25,
            total_latency: 1.5,
            recall_at_k: 0.5,
            mrr_at_k: 1.0,
            rouge_l_f1: 0.4,
            retrieved_ids: vec!["a.txt_0000".to_string(), "b.txt_0001".to_string()],
            relevant_ids: vec!["a.txt_0000".to_string()],
            generated_answer: "En Madrid.".to_string(),
            outcome: OutcomeKind::Answered,
            error: None,
        }
    }

    #[test]
    fn test_records_csv_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("evaluation_results.csv");

        write_records_csv(&[record()], &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(RECORD_HEADER.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("\"¿Dónde, exactamente?\",vector,1.5,0.25,0.5,1,0.4,En Madrid.,a.txt_0000|b.txt_0001,a.txt_0000,answered,")
        );
    }

    #[test]
    fn test_summary_csv_and_json() {
        let dir = TempDir::new().unwrap();
        let records = vec![record()];
        let summaries = summarize(&records, &[Backend::Vector]);

        let summary_path = dir.path().join("summary.csv");
        write_summary_csv(&summaries, &summary_path).unwrap();
        let summary = fs::read_to_string(&summary_path).unwrap();
        assert!(summary.lines().nth(1).unwrap().starts_with("vector,1,0,0,0.5000,1.0000,0.4000"));

        let report = EvaluationReport {
            k: 5,
            records,
            summaries,
            total_time_secs: 2.0,
        };
        let json_path = dir.path().join("run.json");
        write_json(&report, &json_path).unwrap();
        let parsed: EvaluationReport =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed.records, report.records);
        assert_eq!(parsed.summaries[0].outcomes[&OutcomeKind::Answered], 1);
    }
}
