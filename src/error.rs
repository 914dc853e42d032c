//! Error types for the retrieval and evaluation pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur in the pipeline.
#[derive(Error, Debug)]
pub enum RagError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The corpus directory does not exist or is not a directory.
    #[error("Corpus path '{0}' does not exist or is not a directory")]
    InvalidCorpusPath(PathBuf),

    /// No documents found in the corpus.
    #[error("No documents found in corpus at '{0}'")]
    EmptyCorpus(PathBuf),

    /// A request or parameter was rejected before any backend was contacted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A search, embedding or generation service could not serve the call.
    #[error("{service} unavailable: {detail}")]
    BackendUnavailable { service: String, detail: String },

    /// Loaded data would silently produce wrong results (bad gold labels, id collisions).
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The SKOS thesaurus could not be parsed.
    #[error("Thesaurus error: {0}")]
    Thesaurus(String),
}

impl RagError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a backend error for the named service.
    pub fn backend(service: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::BackendUnavailable {
            service: service.into(),
            detail: detail.to_string(),
        }
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::LlmParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_message() {
        let err = RagError::backend("solr", "connection refused");
        assert_eq!(err.to_string(), "solr unavailable: connection refused");
    }

    #[test]
    fn test_io_error_keeps_path() {
        let err = RagError::io(
            "/tmp/gold.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("/tmp/gold.json"));
    }
}
