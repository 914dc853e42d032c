//! Raw corpus documents.
//!
//! A document is the unit handed to the segmenter: a name (the file basename,
//! which becomes the chunk-id prefix) and its raw text.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A raw document from the corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Document name. For files this is the basename including extension.
    pub name: String,
    /// Original file path (if loaded from file).
    pub path: Option<PathBuf>,
    /// Raw text content.
    pub text: String,
}

impl Document {
    /// Create a document from raw text content.
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            text: text.into(),
        }
    }

    /// Load a UTF-8 text file as a document.
    pub fn from_text_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();

        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            text,
        })
    }

    /// Approximate token count (words / 0.75).
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.text)
    }
}

/// Load every file with the given extension under `dir`, sorted by path.
///
/// The sort keeps chunk ordinals stable between runs on the same corpus.
pub fn load_corpus(dir: &Path, extension: &str) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(RagError::InvalidCorpusPath(dir.to_path_buf()));
    }

    let extension = extension.trim_start_matches('.');
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        })
        .collect();

    if paths.is_empty() {
        return Err(RagError::EmptyCorpus(dir.to_path_buf()));
    }

    paths.sort();
    tracing::info!(files = paths.len(), dir = %dir.display(), "loading corpus");

    paths.iter().map(|p| Document::from_text_file(p)).collect()
}

/// Estimate token count from text (rough approximation: words / 0.75).
fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f64 / 0.75) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_document_from_text() {
        let doc = Document::from_text("informe.txt", "Hola. Adiós.");
        assert_eq!(doc.name, "informe.txt");
        assert!(doc.path.is_none());
    }

    #[test]
    fn test_from_text_file_uses_basename() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("acta_01.txt");
        std::fs::write(&path, "Primera frase.").unwrap();

        let doc = Document::from_text_file(&path).unwrap();
        assert_eq!(doc.name, "acta_01.txt");
        assert_eq!(doc.text, "Primera frase.");
    }

    #[test]
    fn test_load_corpus_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "B.").unwrap();
        std::fs::write(dir.path().join("a.txt"), "A.").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("c.TXT"), "C.").unwrap();

        let docs = load_corpus(dir.path(), "txt").unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.TXT"]);
    }

    #[test]
    fn test_load_corpus_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_corpus(dir.path(), "txt"),
            Err(RagError::EmptyCorpus(_))
        ));
        assert!(matches!(
            load_corpus(&dir.path().join("missing"), "txt"),
            Err(RagError::InvalidCorpusPath(_))
        ));
    }

    #[test]
    fn test_estimate_tokens() {
        let doc = Document::from_text("d", "one two three four five six seven eight");
        let tokens = doc.estimated_tokens();
        assert!((10..=12).contains(&tokens));
    }
}
