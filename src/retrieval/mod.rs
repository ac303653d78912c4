//! Multi-query retrieval with exact-text deduplication

mod expander;
mod reranker;

pub use expander::QueryExpander;
pub use reranker::{select_reranker, CrossEncoderReranker, NullReranker, Reranker};

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::providers::EmbeddingProvider;
use crate::storage::ChunkStore;
use crate::types::RetrievalCandidate;

/// Retrieves candidate chunks for a query via multi-query vector search
///
/// Candidates are deduplicated by exact text equality: byte-identical chunks
/// from different sources collapse to the first-seen one. Near-duplicate text
/// is intentionally not collapsed.
pub struct Retriever {
    store: Arc<ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    expander: QueryExpander,
}

impl Retriever {
    /// Create a retriever over an open store
    pub fn new(
        store: Arc<ChunkStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        expander: QueryExpander,
    ) -> Self {
        Self {
            store,
            embedder,
            expander,
        }
    }

    /// Retrieve unique candidates for `query`, searching `per_query_k` per
    /// expanded phrasing
    ///
    /// Expansion failure degrades to single-query retrieval; order of the
    /// returned candidates carries no ranking meaning.
    pub async fn retrieve(
        &self,
        query: &str,
        per_query_k: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        // Nothing to search means nothing to expand either; skip the
        // external call entirely.
        if self.store.is_empty() {
            tracing::debug!("chunk store is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let queries = match self.expander.try_expand(query).await {
            Ok(queries) => {
                tracing::debug!(count = queries.len(), "query expanded");
                queries
            }
            Err(e) => {
                tracing::warn!(error = %e, "query expansion failed, using original query only");
                vec![query.to_string()]
            }
        };

        let mut seen_texts: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();

        for expanded in &queries {
            let vector = self.embedder.embed(expanded).await?;
            for (chunk, similarity) in self.store.query(&vector, per_query_k)? {
                if seen_texts.insert(chunk.text.clone()) {
                    candidates.push(RetrievalCandidate {
                        chunk,
                        score: similarity,
                    });
                }
            }
        }

        tracing::debug!(
            queries = queries.len(),
            candidates = candidates.len(),
            "retrieval complete"
        );
        Ok(candidates)
    }
}
