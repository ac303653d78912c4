//! Provider abstractions for embeddings and text generation
//!
//! Trait seams around the external services so any provider implementing the
//! same contracts is substitutable (tests use in-process stubs).

pub mod embedding;
pub mod generator;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use generator::TextGenerator;
pub use ollama::{OllamaEmbedder, OllamaGenerator};
