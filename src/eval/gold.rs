//! Gold-standard loading.
//!
//! The file is a JSON array of `{query, relevant_chunk_ids, ideal_answer}`. Problems are
//! reported at load time, before any query is sent.

use crate::error::{RagError, Result};
use crate::segment::Chunk;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// One labelled question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldQuery {
    pub query: String,
    /// Unique, in file order.
    pub relevant_chunk_ids: Vec<String>,
    pub ideal_answer: String,
}

/// Load and check a gold-standard file.
pub fn load_gold(path: &Path) -> Result<Vec<GoldQuery>> {
    let content = fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
    let gold = parse_gold(&content)?;
    tracing::info!(path = %path.display(), queries = gold.len(), "gold standard loaded");
    Ok(gold)
}

/// Parse gold-standard JSON.
///
/// Missing fields and blank queries are [`RagError::DataIntegrity`]. Repeated relevant
/// ids are collapsed; an empty relevance set is allowed but logged.
pub fn parse_gold(content: &str) -> Result<Vec<GoldQuery>> {
    let mut gold: Vec<GoldQuery> = serde_json::from_str(content)
        .map_err(|e| RagError::DataIntegrity(format!("malformed gold standard: {}", e)))?;

    for (index, item) in gold.iter_mut().enumerate() {
        if item.query.trim().is_empty() {
            return Err(RagError::DataIntegrity(format!(
                "gold item {} has an empty query",
                index
            )));
        }

        let mut seen = HashSet::new();
        item.relevant_chunk_ids.retain(|id| seen.insert(id.clone()));

        if item.relevant_chunk_ids.is_empty() {
            tracing::warn!(index, query = %item.query, "gold query has no relevant chunks; recall and MRR will be 0");
        }
    }

    Ok(gold)
}

/// Fail if any labelled id is missing from `chunks`.
pub fn verify_against_chunks(gold: &[GoldQuery], chunks: &[Chunk]) -> Result<()> {
    let known: HashSet<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();

    let missing: Vec<String> = gold
        .iter()
        .flat_map(|g| g.relevant_chunk_ids.iter())
        .filter(|id| !known.contains(id.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let preview: Vec<&str> = missing.iter().take(5).map(String::as_str).collect();
    Err(RagError::DataIntegrity(format!(
        "{} relevant chunk id(s) not in the chunk table, e.g. {}",
        missing.len(),
        preview.join(", ")
    )))
}
