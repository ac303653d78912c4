//! Offline ingestion: source directory -> chunk store
//!
//! Incremental by source basename: a file already present in the store is
//! never read again, which also means content changes to a previously
//! ingested filename are ignored. That is deliberate; re-embedding on every
//! edit would dominate ingestion cost.

mod splitter;

pub use splitter::RecursiveSplitter;

use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::providers::EmbeddingProvider;
use crate::storage::ChunkStore;
use crate::types::Chunk;

/// Outcome of one `sync` run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    /// Text files found in the source directory
    pub files_seen: usize,
    /// Files ingested by this run
    pub files_new: usize,
    /// New files skipped because they were empty after trimming
    pub files_skipped_empty: usize,
    /// Chunks appended to the store
    pub chunks_added: usize,
}

/// Ingestion pipeline; the sole writer of the chunk store
pub struct IngestPipeline {
    store: Arc<ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: RecursiveSplitter,
    batch_size: usize,
}

impl std::fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl IngestPipeline {
    /// Create a pipeline over an open store
    ///
    /// Fails when the chunking configuration is invalid.
    pub fn new(
        store: Arc<ChunkStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        chunking: &ChunkingConfig,
        batch_size: usize,
    ) -> Result<Self> {
        Ok(Self {
            store,
            embedder,
            splitter: RecursiveSplitter::new(
                chunking.chunk_size,
                chunking.chunk_overlap,
                chunking.separators.clone(),
            )?,
            batch_size: batch_size.max(1),
        })
    }

    /// Ingest all new text files from `source_dir`
    ///
    /// Re-running on an unchanged directory is a no-op.
    pub async fn sync<P: AsRef<Path>>(&self, source_dir: P) -> Result<SyncSummary> {
        let existing = self.store.list_sources();
        let mut summary = SyncSummary::default();

        for entry in WalkDir::new(source_dir.as_ref())
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(basename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            summary.files_seen += 1;

            if existing.contains(basename) {
                tracing::debug!(source = basename, "already ingested, skipping");
                continue;
            }

            let raw_text = std::fs::read_to_string(path)?;
            if raw_text.trim().is_empty() {
                tracing::warn!(source = basename, "empty after trimming, skipping");
                summary.files_skipped_empty += 1;
                continue;
            }

            let added = self.ingest_document(basename, &raw_text).await?;
            summary.files_new += 1;
            summary.chunks_added += added;
            tracing::info!(source = basename, chunks = added, "ingested");
        }

        tracing::info!(
            files_seen = summary.files_seen,
            files_new = summary.files_new,
            chunks_added = summary.chunks_added,
            "sync complete"
        );
        Ok(summary)
    }

    async fn ingest_document(&self, source: &str, raw_text: &str) -> Result<usize> {
        let chunks: Vec<Chunk> = self
            .splitter
            .split(raw_text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(text, source, i as u32))
            .collect();

        let mut added = 0;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            self.store.upsert(batch, &vectors)?;
            added += batch.len();
        }
        Ok(added)
    }
}
