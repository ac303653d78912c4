//! Chunk and answer types with source tracking

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A chunk of text from a source document, the atomic retrieval unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable id derived from source and content
    pub id: String,
    /// Text content (never empty)
    pub text: String,
    /// Originating document, keyed by file basename
    pub source: String,
    /// Position of this chunk within its source document
    pub sequence_no: u32,
}

impl Chunk {
    /// Create a new chunk with a derived id
    pub fn new(text: impl Into<String>, source: impl Into<String>, sequence_no: u32) -> Self {
        let text = text.into();
        let source = source.into();
        let id = derive_chunk_id(&source, &text);
        Self {
            id,
            text,
            source,
            sequence_no,
        }
    }
}

/// Derive a stable chunk id from its source name and content
pub fn derive_chunk_id(source: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// A retrieved chunk with its relevance score, produced per query
#[derive(Debug, Clone)]
pub struct RetrievalCandidate {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Relevance score, higher is better; similarity before reranking,
    /// cross-encoder score after
    pub score: f32,
}

/// Final answer together with the source documents it drew from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text (or an error string for failed generations)
    pub text: String,
    /// Unique source names in the order their chunks appeared in the context
    pub sources: Vec<String>,
}
