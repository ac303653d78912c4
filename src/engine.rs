//! Pipeline wiring and the query flow
//!
//! `RagEngine` is the explicit context object for the process: every
//! component is constructed once here and injected by reference, replacing
//! any notion of module-level singletons. Startup is fail-fast for the
//! embedder and the chunk store; the reranker is probed and degrades quietly.

use chrono::Utc;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::feedback::{FeedbackRecord, FeedbackSink, JsonlFeedbackSink, Vote};
use crate::generation::{AnswerGenerator, ANSWER_ERROR_PREFIX};
use crate::providers::{EmbeddingProvider, OllamaEmbedder, OllamaGenerator, TextGenerator};
use crate::retrieval::{select_reranker, QueryExpander, Reranker, Retriever};
use crate::storage::ChunkStore;
use crate::types::{Answer, Chunk};

/// The assembled query pipeline
pub struct RagEngine {
    retriever: Retriever,
    reranker: Arc<dyn Reranker>,
    generator: AnswerGenerator,
    feedback: Arc<dyn FeedbackSink>,
    per_query_k: usize,
    top_n: usize,
    config_tag: String,
}

impl RagEngine {
    /// Construct the engine for serving queries
    ///
    /// Fails when the embedding provider cannot load or the persisted index
    /// is missing; a reranker that does not answer its probe only downgrades
    /// the pipeline to truncation.
    pub async fn new(config: &RagConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OllamaEmbedder::connect(&config.llm, &config.embeddings).await?);
        let store = Arc::new(ChunkStore::open(&config.index.path)?);
        if store.dimensions() != embedder.dimensions() {
            return Err(Error::config(format!(
                "index has {} dimensions but embedding model produces {}",
                store.dimensions(),
                embedder.dimensions()
            )));
        }

        let generator: Arc<dyn TextGenerator> = Arc::new(OllamaGenerator::new(&config.llm)?);
        let reranker = select_reranker(&config.reranker).await;

        Ok(Self::assemble(config, store, embedder, generator, reranker))
    }

    /// Assemble an engine from already-constructed components
    ///
    /// Used by tests and by embedders/generators other than the default HTTP
    /// providers.
    pub fn assemble(
        config: &RagConfig,
        store: Arc<ChunkStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
        reranker: Arc<dyn Reranker>,
    ) -> Self {
        // Recall/cost trade-off: cast a wide net only when a reranker will
        // refine it afterwards.
        let per_query_k = if reranker.is_noop() {
            config.retrieval.per_query_k_plain
        } else {
            config.retrieval.per_query_k_reranked
        };
        tracing::info!(
            reranker = reranker.name(),
            per_query_k,
            top_n = config.retrieval.top_n,
            "query pipeline assembled"
        );

        let expander = QueryExpander::new(
            Arc::clone(&generator),
            config.retrieval.expansion_count,
            config.llm.expansion_temperature,
        );
        let retriever = Retriever::new(store, embedder, expander);
        let answer_generator = AnswerGenerator::new(generator, config.llm.temperature);
        let feedback: Arc<dyn FeedbackSink> =
            Arc::new(JsonlFeedbackSink::new(config.feedback.log_path.clone()));

        Self {
            retriever,
            reranker,
            generator: answer_generator,
            feedback,
            per_query_k,
            top_n: config.retrieval.top_n,
            config_tag: config.feedback.config_tag.clone(),
        }
    }

    /// Answer one user question
    ///
    /// Soft failures (expansion, rerank, generation) never surface as errors:
    /// the worst case is a truncated candidate list or an error-string answer
    /// with no sources. Only infrastructure faults (store or embedder broken
    /// mid-request) propagate.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let candidates = self.retriever.retrieve(question, self.per_query_k).await?;

        let top = match self
            .reranker
            .rerank(question, candidates.clone(), self.top_n)
            .await
        {
            Ok(top) => top,
            Err(e) => {
                tracing::warn!(error = %e, "rerank failed, truncating unranked candidates");
                let mut fallback = candidates;
                fallback.truncate(self.top_n);
                fallback
            }
        };

        let context_chunks: Vec<Chunk> = top.into_iter().map(|c| c.chunk).collect();
        match self.generator.generate(question, &context_chunks).await {
            Ok(text) => Ok(Answer {
                text,
                sources: unique_sources(&context_chunks),
            }),
            Err(e) => {
                tracing::error!(error = %e, "answer generation failed");
                Ok(Answer {
                    text: format!("{} {}", ANSWER_ERROR_PREFIX, e),
                    sources: Vec::new(),
                })
            }
        }
    }

    /// Record user feedback for an answered question
    pub fn record_feedback(&self, vote: Vote, question: &str, answer: &Answer) -> Result<()> {
        self.feedback.append(&FeedbackRecord {
            timestamp: Utc::now(),
            vote,
            question: question.to_string(),
            answer: answer.text.clone(),
            sources: answer.sources.clone(),
            config_tag: self.config_tag.clone(),
        })
    }
}

/// Unique source names in the order their chunks appear in the context
fn unique_sources(chunks: &[Chunk]) -> Vec<String> {
    let mut sources = Vec::new();
    for chunk in chunks {
        if !sources.iter().any(|s| s == &chunk.source) {
            sources.push(chunk.source.clone());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    #[test]
    fn sources_are_unique_and_ordered() {
        let chunks = vec![
            Chunk::new("一", "B.txt", 0),
            Chunk::new("二", "A.txt", 0),
            Chunk::new("三", "B.txt", 1),
        ];
        assert_eq!(unique_sources(&chunks), vec!["B.txt", "A.txt"]);
    }
}
