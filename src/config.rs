//! Configuration for the pipeline.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.
//!
//! ```yaml
//! llm:
//!   provider: gemini
//!   api_key: "..."
//!   model: gemini-1.5-flash
//! solr:
//!   host: localhost
//!   core: rag_core
//! milvus:
//!   host: localhost
//!   collection: rag_corpus
//! corpus:
//!   language: es
//!   chunk_size: 3
//!   chunk_overlap: 1
//! ```

use crate::error::{RagError, Result};
use crate::language::Language;
use crate::segment::ChunkOptions;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which generative API the LLM client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Google Gemini `generateContent`.
    #[default]
    Gemini,
    /// Any OpenAI-compatible `/v1/chat/completions` endpoint.
    #[serde(alias = "openai-compatible")]
    OpenAi,
}

impl FromStr for LlmProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            "openai" | "openai-compatible" => Ok(LlmProvider::OpenAi),
            other => Err(RagError::Config(format!("Unknown LLM provider '{}'", other))),
        }
    }
}

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API flavour.
    pub provider: LlmProvider,

    /// Base URL for the LLM API. Empty means the provider's public endpoint.
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gemini-1.5-flash", "gpt-4o-mini")
    pub model: String,

    /// Maximum tokens for response
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_base: String::new(),
            api_key: String::new(),
            model: "gemini-1.5-flash".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Base URL with the provider default filled in.
    pub fn resolved_api_base(&self) -> String {
        if !self.api_base.is_empty() {
            return self.api_base.trim_end_matches('/').to_string();
        }
        match self.provider {
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com".to_string(),
            LlmProvider::OpenAi => "https://api.openai.com".to_string(),
        }
    }
}

/// Where query embeddings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    #[default]
    Http,
    /// In-process sentence-transformers model (feature `local-embeddings`).
    Local,
}

impl FromStr for EmbeddingProviderKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(EmbeddingProviderKind::Http),
            "local" => Ok(EmbeddingProviderKind::Local),
            other => Err(RagError::Config(format!(
                "Unknown embedding provider '{}'",
                other
            ))),
        }
    }
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub api_base: String,
    pub api_key: String,
    /// Model id. Must be the model the vector index was built with.
    pub model: String,
    /// Vector length produced by the model.
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            api_base: "http://localhost:8080".to_string(),
            api_key: String::new(),
            model: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            dimension: 384,
            timeout_secs: 60,
        }
    }
}

/// Solr (lexical backend) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolrConfig {
    pub host: String,
    pub port: u16,
    pub core: String,
    pub id_field: String,
    /// Analysed text field (use a `_txt_es` dynamic field for Spanish analysis).
    pub text_field: String,
    pub source_field: String,
    pub timeout_secs: u64,
    /// Documents per update request when indexing.
    pub batch_size: usize,
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8983,
            core: "rag_core".to_string(),
            id_field: "id".to_string(),
            text_field: "text_txt_es".to_string(),
            source_field: "source_s".to_string(),
            timeout_secs: 30,
            batch_size: 500,
        }
    }
}

impl SolrConfig {
    /// `http://{host}:{port}/solr/{core}`
    pub fn core_url(&self) -> String {
        format!("http://{}:{}/solr/{}", self.host, self.port, self.core)
    }
}

/// Milvus (vector backend) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MilvusConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token (`user:password` or API key). Empty disables auth.
    pub token: String,
    pub collection: String,
    pub id_field: String,
    pub text_field: String,
    pub source_field: String,
    pub vector_field: String,
    /// HNSW search breadth.
    pub ef: u32,
    pub timeout_secs: u64,
    /// Chunks embedded and inserted per request when indexing.
    pub batch_size: usize,
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 19530,
            token: String::new(),
            collection: "rag_corpus".to_string(),
            id_field: "doc_id".to_string(),
            text_field: "text_content".to_string(),
            source_field: "source_document".to_string(),
            vector_field: "vector_embedding".to_string(),
            ef: 64,
            timeout_secs: 30,
            batch_size: 100,
        }
    }
}

impl MilvusConfig {
    /// `http://{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Corpus and segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub language: Language,
    /// Sentences per chunk.
    pub chunk_size: usize,
    /// Sentences shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Extension of corpus files.
    pub extension: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            language: Language::Spanish,
            chunk_size: 3,
            chunk_overlap: 1,
            extension: "txt".to_string(),
        }
    }
}

impl CorpusConfig {
    /// Validated window options.
    pub fn chunk_options(&self) -> Result<ChunkOptions> {
        ChunkOptions::new(self.chunk_size, self.chunk_overlap)
    }
}

/// Evaluation harness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Cut-off for Recall@k / MRR@k and the number of passages retrieved.
    pub k: usize,
    /// Pairs evaluated concurrently.
    pub concurrency: usize,
    /// Per-pair timeout in seconds.
    pub pair_timeout_secs: u64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            k: 5,
            concurrency: 4,
            pair_timeout_secs: 180,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub solr: SolrConfig,
    pub milvus: MilvusConfig,
    pub corpus: CorpusConfig,
    pub eval: EvalConfig,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_KEY, SOLR_HOST, MILVUS_HOST, ...)
    /// 2. Config file (`path`, or ~/.config/rag-compare/config.yaml)
    /// 3. Default values
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_file_path().filter(|p| p.exists()),
        };

        let mut config = match file {
            Some(p) => Self::load_from_file(&p)?,
            None => Config::default(),
        };

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse a YAML document. Missing sections and keys keep their defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| RagError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Override fields from variables returned by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let text = |key: &str, field: &mut String| {
            if let Some(value) = lookup(key) {
                *field = value;
            }
        };
        text("LLM_API_BASE", &mut self.llm.api_base);
        text("LLM_API_KEY", &mut self.llm.api_key);
        text("LLM_MODEL", &mut self.llm.model);
        text("EMBEDDING_API_BASE", &mut self.embedding.api_base);
        text("EMBEDDING_API_KEY", &mut self.embedding.api_key);
        text("EMBEDDING_MODEL", &mut self.embedding.model);
        text("SOLR_HOST", &mut self.solr.host);
        text("SOLR_CORE", &mut self.solr.core);
        text("MILVUS_HOST", &mut self.milvus.host);
        text("MILVUS_TOKEN", &mut self.milvus.token);
        text("MILVUS_COLLECTION", &mut self.milvus.collection);

        parse_env(&lookup, "LLM_PROVIDER", &mut self.llm.provider)?;
        parse_env(&lookup, "LLM_MAX_TOKENS", &mut self.llm.max_tokens)?;
        parse_env(&lookup, "LLM_TEMPERATURE", &mut self.llm.temperature)?;
        parse_env(&lookup, "LLM_TIMEOUT_SECS", &mut self.llm.timeout_secs)?;
        parse_env(&lookup, "EMBEDDING_PROVIDER", &mut self.embedding.provider)?;
        parse_env(&lookup, "EMBEDDING_DIMENSION", &mut self.embedding.dimension)?;
        parse_env(&lookup, "SOLR_PORT", &mut self.solr.port)?;
        parse_env(&lookup, "MILVUS_PORT", &mut self.milvus.port)?;
        parse_env(&lookup, "CORPUS_LANGUAGE", &mut self.corpus.language)?;
        parse_env(&lookup, "CHUNK_SIZE", &mut self.corpus.chunk_size)?;
        parse_env(&lookup, "CHUNK_OVERLAP", &mut self.corpus.chunk_overlap)?;
        parse_env(&lookup, "EVAL_K", &mut self.eval.k)?;
        parse_env(&lookup, "EVAL_CONCURRENCY", &mut self.eval.concurrency)?;
        parse_env(&lookup, "EVAL_TIMEOUT_SECS", &mut self.eval.pair_timeout_secs)?;

        Ok(())
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rag-compare")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate settings needed to answer queries.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.is_empty() {
            return Err(RagError::Config(
                "LLM API key is required. Set LLM_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(RagError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(RagError::Config(
                "Embedding dimension must be greater than 0.".to_string(),
            ));
        }

        if self.embedding.provider == EmbeddingProviderKind::Http
            && self.embedding.api_base.is_empty()
        {
            return Err(RagError::Config(
                "Embedding API base URL is required. Set EMBEDDING_API_BASE.".to_string(),
            ));
        }

        self.corpus.chunk_options()?;

        if self.eval.k == 0 || self.eval.concurrency == 0 || self.eval.pair_timeout_secs == 0 {
            return Err(RagError::Config(
                "eval.k, eval.concurrency and eval.pair_timeout_secs must be greater than 0."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &mut T,
) -> Result<()> {
    if let Some(raw) = lookup(key) {
        *field = raw
            .parse()
            .map_err(|_| RagError::Config(format!("Invalid value '{}' for {}", raw, key)))?;
    }
    Ok(())
}
