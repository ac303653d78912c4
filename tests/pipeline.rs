//! End-to-end pipeline tests with stub providers

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use park_rag::config::RagConfig;
use park_rag::error::{Error, Result};
use park_rag::generation::{ANSWER_ERROR_PREFIX, NO_CONTEXT_ANSWER};
use park_rag::ingestion::IngestPipeline;
use park_rag::providers::embedding::normalize;
use park_rag::providers::{EmbeddingProvider, TextGenerator};
use park_rag::retrieval::{NullReranker, Reranker};
use park_rag::storage::ChunkStore;
use park_rag::types::RetrievalCandidate;
use park_rag::RagEngine;

const DIMS: usize = 8;

/// Deterministic embedder: character-statistics vectors, unit-normalized
struct StubEmbedder;

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; DIMS];
                for (i, c) in t.chars().enumerate() {
                    v[(c as usize + i) % DIMS] += 1.0;
                }
                normalize(&mut v);
                v
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Echoes every prompt back, so generated answers contain their context
struct EchoGenerator {
    calls: AtomicUsize,
}

impl EchoGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(prompt.to_string())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Fails every call, standing in for an unreachable service
struct DownGenerator;

#[async_trait]
impl TextGenerator for DownGenerator {
    async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
        Err(Error::llm("connection refused"))
    }

    fn name(&self) -> &str {
        "down"
    }
}

struct BrokenReranker;

#[async_trait]
impl Reranker for BrokenReranker {
    async fn rerank(
        &self,
        _query: &str,
        _candidates: Vec<RetrievalCandidate>,
        _top_n: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        Err(Error::Rerank("scorer crashed".to_string()))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn test_config(index_dir: &TempDir, feedback_dir: &TempDir) -> RagConfig {
    let mut config = RagConfig::default();
    config.index.path = index_dir.path().to_path_buf();
    config.feedback.log_path = feedback_dir.path().join("feedback.jsonl");
    config
}

async fn ingest(store: Arc<ChunkStore>, config: &RagConfig, source_dir: &TempDir) -> usize {
    let pipeline =
        IngestPipeline::new(store, Arc::new(StubEmbedder), &config.chunking, 16).unwrap();
    pipeline.sync(source_dir.path()).await.unwrap().chunks_added
}

#[tokio::test]
async fn sync_is_idempotent() {
    let index_dir = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    std::fs::write(
        source_dir.path().join("A.txt"),
        "门票价格为每人499元。\n\n开园时间为上午九点。",
    )
    .unwrap();
    std::fs::write(source_dir.path().join("notes.md"), "ignored, not a txt").unwrap();

    let config = RagConfig::default();
    let store = Arc::new(ChunkStore::create(index_dir.path(), DIMS).unwrap());

    let first = ingest(store.clone(), &config, &source_dir).await;
    assert!(first > 0);
    let after_first = store.len();

    let second = ingest(store.clone(), &config, &source_dir).await;
    assert_eq!(second, 0, "second sync must add nothing");
    assert_eq!(store.len(), after_first);
    assert_eq!(store.list_sources().len(), 1);
}

#[tokio::test]
async fn changed_content_for_known_filename_is_ignored() {
    let index_dir = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    let file = source_dir.path().join("A.txt");
    std::fs::write(&file, "门票价格为每人499元。").unwrap();

    let config = RagConfig::default();
    let store = Arc::new(ChunkStore::create(index_dir.path(), DIMS).unwrap());
    ingest(store.clone(), &config, &source_dir).await;
    let before = store.len();

    // The basename is already known, so the new content is never read.
    std::fs::write(&file, "门票价格已调整为每人599元。").unwrap();
    let added = ingest(store.clone(), &config, &source_dir).await;
    assert_eq!(added, 0);
    assert_eq!(store.len(), before);
    let hit = store.query(&StubEmbedder.embed("门票").await.unwrap(), 1).unwrap();
    assert!(hit[0].0.text.contains("499"), "original content survives");
}

#[tokio::test]
async fn degenerate_chunking_config_fails_pipeline_construction() {
    let index_dir = TempDir::new().unwrap();
    let config: RagConfig = toml::from_str(
        r#"
        [chunking]
        chunk_size = 50
        chunk_overlap = 50
        "#,
    )
    .unwrap();
    let store = Arc::new(ChunkStore::create(index_dir.path(), DIMS).unwrap());

    let err = IngestPipeline::new(store, Arc::new(StubEmbedder), &config.chunking, 16).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn empty_files_are_skipped() {
    let index_dir = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    std::fs::write(source_dir.path().join("empty.txt"), "   \n\n  ").unwrap();

    let config = RagConfig::default();
    let store = Arc::new(ChunkStore::create(index_dir.path(), DIMS).unwrap());
    let pipeline =
        IngestPipeline::new(store.clone(), Arc::new(StubEmbedder), &config.chunking, 16).unwrap();
    let summary = pipeline.sync(source_dir.path()).await.unwrap();

    assert_eq!(summary.files_seen, 1);
    assert_eq!(summary.files_skipped_empty, 1);
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn ticket_price_question_is_answered_from_ingested_chunk() {
    let index_dir = TempDir::new().unwrap();
    let feedback_dir = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    std::fs::write(source_dir.path().join("A.txt"), "门票价格为每人499元。").unwrap();

    let config = test_config(&index_dir, &feedback_dir);
    let store = Arc::new(ChunkStore::create(index_dir.path(), DIMS).unwrap());
    ingest(store.clone(), &config, &source_dir).await;

    let engine = RagEngine::assemble(
        &config,
        store,
        Arc::new(StubEmbedder),
        EchoGenerator::new(),
        Arc::new(NullReranker),
    );

    let answer = engine.ask("门票多少钱？").await.unwrap();
    assert!(answer.text.contains("499"), "answer must cite the chunk");
    assert_eq!(answer.sources, vec!["A.txt"]);
}

#[tokio::test]
async fn empty_index_short_circuits_to_canned_answer() {
    let index_dir = TempDir::new().unwrap();
    let feedback_dir = TempDir::new().unwrap();

    let config = test_config(&index_dir, &feedback_dir);
    let store = Arc::new(ChunkStore::create(index_dir.path(), DIMS).unwrap());
    let generator = EchoGenerator::new();

    let engine = RagEngine::assemble(
        &config,
        store,
        Arc::new(StubEmbedder),
        generator.clone(),
        Arc::new(NullReranker),
    );

    let answer = engine.ask("门票多少钱？").await.unwrap();
    assert_eq!(answer.text, NO_CONTEXT_ANSWER);
    assert!(answer.sources.is_empty());
    // Neither expansion nor answer generation may touch the service.
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generation_failure_becomes_error_string_answer() {
    let index_dir = TempDir::new().unwrap();
    let feedback_dir = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    std::fs::write(source_dir.path().join("A.txt"), "门票价格为每人499元。").unwrap();

    let config = test_config(&index_dir, &feedback_dir);
    let store = Arc::new(ChunkStore::create(index_dir.path(), DIMS).unwrap());
    ingest(store.clone(), &config, &source_dir).await;

    let engine = RagEngine::assemble(
        &config,
        store,
        Arc::new(StubEmbedder),
        Arc::new(DownGenerator),
        Arc::new(NullReranker),
    );

    // Expansion fails soft, retrieval still works, generation fails visible.
    let answer = engine.ask("门票多少钱？").await.unwrap();
    assert!(answer.text.starts_with(ANSWER_ERROR_PREFIX));
    assert!(answer.sources.is_empty());

    // The process is unaffected: the next request works the same way.
    let again = engine.ask("门票多少钱？").await.unwrap();
    assert!(again.text.starts_with(ANSWER_ERROR_PREFIX));
}

#[tokio::test]
async fn rerank_failure_falls_back_to_truncation() {
    let index_dir = TempDir::new().unwrap();
    let feedback_dir = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    std::fs::write(
        source_dir.path().join("A.txt"),
        "门票价格为每人499元。\n\n开园时间为上午九点。\n\n烟花表演在晚上八点半开始。",
    )
    .unwrap();

    let config = test_config(&index_dir, &feedback_dir);
    let store = Arc::new(ChunkStore::create(index_dir.path(), DIMS).unwrap());
    ingest(store.clone(), &config, &source_dir).await;

    let engine = RagEngine::assemble(
        &config,
        store,
        Arc::new(StubEmbedder),
        EchoGenerator::new(),
        Arc::new(BrokenReranker),
    );

    let answer = engine.ask("门票多少钱？").await.unwrap();
    assert!(!answer.text.starts_with(ANSWER_ERROR_PREFIX));
    assert_eq!(answer.sources, vec!["A.txt"]);
}

#[tokio::test]
async fn feedback_is_appended_for_answers() {
    use park_rag::feedback::Vote;

    let index_dir = TempDir::new().unwrap();
    let feedback_dir = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    std::fs::write(source_dir.path().join("A.txt"), "门票价格为每人499元。").unwrap();

    let config = test_config(&index_dir, &feedback_dir);
    let store = Arc::new(ChunkStore::create(index_dir.path(), DIMS).unwrap());
    ingest(store.clone(), &config, &source_dir).await;

    let engine = RagEngine::assemble(
        &config,
        store,
        Arc::new(StubEmbedder),
        EchoGenerator::new(),
        Arc::new(NullReranker),
    );

    let answer = engine.ask("门票多少钱？").await.unwrap();
    engine
        .record_feedback(Vote::Up, "门票多少钱？", &answer)
        .unwrap();

    let log = std::fs::read_to_string(config.feedback.log_path).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains("\"up\""));
    assert!(log.contains("A.txt"));
}
