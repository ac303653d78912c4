//! park-rag: retrieval-augmented question answering over a themed-park knowledge base
//!
//! Documents are chunked, embedded, and stored in a persistent chunk store.
//! At query time the question is expanded into several phrasings, candidates
//! are retrieved by vector similarity, optionally reranked by a cross-encoder,
//! and the top chunks ground the generated answer.

pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use engine::RagEngine;
pub use error::{Error, Result};
pub use types::{Answer, Chunk, RetrievalCandidate};
