//! Corpus segmentation into overlapping sentence-window chunks.
//!
//! A document is split into sentences, then a window of `chunk_size` sentences slides
//! over them with stride `chunk_size - overlap`. Each window becomes a [`Chunk`] whose id
//! is `"{document}_{ordinal:04}"`. Both search backends and the gold labels join on that
//! id, so segmentation must stay deterministic.
//!
//! ```
//! use rag_compare::document::Document;
//! use rag_compare::segment::{ChunkOptions, Segmenter};
//! use rag_compare::Language;
//!
//! let segmenter = Segmenter::new(ChunkOptions::new(3, 1).unwrap(), Language::Spanish);
//! let chunks = segmenter.segment(&Document::from_text("doc", "Uno. Dos. Tres. Cuatro. Cinco."));
//!
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[1].chunk_id, "doc_0001");
//! assert_eq!(chunks[1].text, "Tres. Cuatro. Cinco.");
//! ```

mod sentences;

pub use sentences::SentenceSplitter;

use crate::document::Document;
use crate::error::{RagError, Result};
use crate::language::Language;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A passage of consecutive sentences from one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Chunk {
    /// `"{source_document}_{ordinal:04}"`.
    pub chunk_id: String,
    /// Sentences of the window joined by a single space.
    pub text: String,
    /// Name of the document the chunk came from.
    pub source_document: String,
}

/// Window parameters, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkOptions {
    /// Sentences per chunk and sentences shared by consecutive chunks.
    ///
    /// Requires `chunk_size > 0` and `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidInput(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::InvalidInput(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the first sentences of consecutive windows.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 3,
            overlap: 1,
        }
    }
}

/// Build the chunk id for the `ordinal`-th chunk of `document`.
///
/// Ordinals are zero-padded to four digits and grow wider past 9999.
pub fn chunk_id(document: &str, ordinal: usize) -> String {
    format!("{}_{:04}", document, ordinal)
}

/// Turns documents into chunks.
#[derive(Debug, Clone)]
pub struct Segmenter {
    options: ChunkOptions,
    splitter: SentenceSplitter,
}

impl Segmenter {
    /// Create a segmenter for a corpus in `language`.
    pub fn new(options: ChunkOptions, language: Language) -> Self {
        Self {
            options,
            splitter: SentenceSplitter::new(language),
        }
    }

    pub fn options(&self) -> ChunkOptions {
        self.options
    }

    /// Segment a single document. Documents without sentences yield no chunks.
    pub fn segment(&self, document: &Document) -> Vec<Chunk> {
        let sentences = self.splitter.split(&document.text);
        self.window(&document.name, &sentences)
    }

    /// Slide the window over already-split sentences.
    pub fn window(&self, document: &str, sentences: &[String]) -> Vec<Chunk> {
        let size = self.options.chunk_size;

        (0..sentences.len())
            .step_by(self.options.stride())
            .enumerate()
            .map(|(ordinal, start)| {
                let end = (start + size).min(sentences.len());
                Chunk {
                    chunk_id: chunk_id(document, ordinal),
                    text: sentences[start..end].join(" "),
                    source_document: document.to_string(),
                }
            })
            .collect()
    }

    /// Segment every document of a corpus, rejecting chunk-id collisions.
    pub fn segment_corpus(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut owners: HashMap<String, usize> = HashMap::new();

        for (doc_idx, document) in documents.iter().enumerate() {
            let doc_chunks = self.segment(document);
            if doc_chunks.is_empty() {
                tracing::warn!(document = %document.name, "document produced no sentences");
            }

            for chunk in doc_chunks {
                if let Some(previous) = owners.insert(chunk.chunk_id.clone(), doc_idx) {
                    return Err(RagError::DataIntegrity(format!(
                        "chunk id '{}' produced by both '{}' and '{}'",
                        chunk.chunk_id,
                        describe(&documents[previous]),
                        describe(document)
                    )));
                }
                chunks.push(chunk);
            }
        }

        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            chunk_size = self.options.chunk_size,
            overlap = self.options.overlap,
            "corpus segmented"
        );
        Ok(chunks)
    }
}

fn describe(document: &Document) -> String {
    document
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| document.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn segmenter(size: usize, overlap: usize) -> Segmenter {
        Segmenter::new(ChunkOptions::new(size, overlap).unwrap(), Language::Spanish)
    }

    #[test]
    fn test_example_windows() {
        let doc = Document::from_text("doc", "Uno. Dos. Tres. Cuatro. Cinco.");
        let chunks = segmenter(3, 1).segment(&doc);

        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        let ids: Vec<_> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(texts, vec!["Uno. Dos. Tres.", "Tres. Cuatro. Cinco.", "Cinco."]);
        assert_eq!(ids, vec!["doc_0000", "doc_0001", "doc_0002"]);
        assert!(chunks.iter().all(|c| c.source_document == "doc"));
    }

    #[test]
    fn test_empty_document_yields_no_chunks() {
        let doc = Document::from_text("vacio.txt", "  \n ");
        assert!(segmenter(3, 1).segment(&doc).is_empty());
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(ChunkOptions::new(0, 0), Err(RagError::InvalidInput(_))));
        assert!(matches!(ChunkOptions::new(3, 3), Err(RagError::InvalidInput(_))));
        assert_eq!(ChunkOptions::new(3, 0).unwrap().stride(), 3);
    }

    #[test]
    fn test_chunk_id_padding_widens() {
        assert_eq!(chunk_id("a.txt", 7), "a.txt_0007");
        assert_eq!(chunk_id("a.txt", 9999), "a.txt_9999");
        assert_eq!(chunk_id("a.txt", 10000), "a.txt_10000");
        assert_ne!(chunk_id("a.txt", 10000), chunk_id("a.txt", 1000));
    }

    #[test]
    fn test_corpus_collision_is_rejected() {
        let mut first = Document::from_text("same.txt", "Hola.");
        first.path = Some("a/same.txt".into());
        let mut second = Document::from_text("same.txt", "Adiós.");
        second.path = Some("b/same.txt".into());

        let err = segmenter(3, 1)
            .segment_corpus(&[first, second])
            .unwrap_err();
        assert!(matches!(err, RagError::DataIntegrity(_)));
        assert!(err.to_string().contains("same.txt_0000"));
    }

    #[test]
    fn test_corpus_concatenates_documents() {
        let docs = vec![
            Document::from_text("a.txt", "Uno. Dos."),
            Document::from_text("b.txt", "Tres."),
        ];
        let chunks = segmenter(2, 0).segment_corpus(&docs).unwrap();
        let ids: Vec<_> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt_0000", "b.txt_0000"]);
    }

    proptest! {
        #[test]
        fn prop_segmentation_is_deterministic(
            n in 0usize..40,
            size in 1usize..6,
            overlap_seed in 0usize..6,
        ) {
            let overlap = overlap_seed % size;
            let text: String = (0..n).map(|i| format!("Frase {}. ", i)).collect();
            let doc = Document::from_text("doc.txt", text);
            let seg = segmenter(size, overlap);
            prop_assert_eq!(seg.segment(&doc), seg.segment(&doc));
        }

        #[test]
        fn prop_every_sentence_is_covered(
            n in 1usize..60,
            size in 1usize..8,
            overlap_seed in 0usize..8,
        ) {
            let overlap = overlap_seed % size;
            let sentences: Vec<String> = (0..n).map(|i| format!("S{}.", i)).collect();
            let chunks = segmenter(size, overlap).window("doc", &sentences);

            for sentence in &sentences {
                let covered = chunks
                    .iter()
                    .any(|c| c.text.split(' ').any(|s| s == sentence));
                prop_assert!(covered, "sentence {} not covered", sentence);
            }
            prop_assert!(chunks.last().unwrap().text.ends_with(sentences.last().unwrap().as_str()));
        }
    }
}
