//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main RAG pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Chunk store / index configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Reranker configuration
    #[serde(default)]
    pub reranker: RerankerConfig,
    /// Feedback log configuration
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("failed to parse {}: {}", path.as_ref().display(), e)))
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model name
    pub model: String,
    /// Batch size for embedding generation during ingestion
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "bge-m3".to_string(),
            batch_size: 32,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters
    pub chunk_overlap: usize,
    /// Separator ladder, coarsest first; the empty string is the raw-slice fallback
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
            separators: [
                "\n\n", "\n", "。", "！", "？", "；", "……", "”", "“", " ", "",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// LLM (text-generation service) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the text-generation service
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for answer generation
    pub temperature: f32,
    /// Temperature for query expansion
    pub expansion_temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "qwen-max".to_string(),
            temperature: 0.3,
            expansion_temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

/// Chunk store / vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the chunk store and vector index
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("park_index"),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of alternate phrasings requested from the query expander
    pub expansion_count: usize,
    /// Per-query candidate count when a reranker will refine the results
    pub per_query_k_reranked: usize,
    /// Per-query candidate count when results go straight to the generator
    pub per_query_k_plain: usize,
    /// Number of chunks fed into the answer prompt
    pub top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            expansion_count: 3,
            per_query_k_reranked: 50,
            per_query_k_plain: 3,
            top_n: 3,
        }
    }
}

/// Reranker configuration
///
/// The cross-encoder is a capability of the environment: it is only used when
/// an endpoint is configured and answers the startup probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Base URL of a cross-encoder scoring service; `None` disables reranking
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_rerank_timeout")]
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_rerank_timeout(),
        }
    }
}

fn default_rerank_timeout() -> u64 {
    30
}

/// Feedback log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Path of the append-only feedback log
    pub log_path: PathBuf,
    /// Tag recorded with each feedback entry to identify the active configuration
    pub config_tag: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("feedback.jsonl"),
            config_tag: "default".to_string(),
        }
    }
}
