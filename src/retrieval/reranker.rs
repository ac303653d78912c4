//! Candidate reranking strategies
//!
//! The cross-encoder is an environment capability, probed once at startup.
//! When it is absent the pipeline runs with plain truncation; reranking never
//! becomes a per-request decision.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RerankerConfig;
use crate::error::{Error, Result};
use crate::types::RetrievalCandidate;

/// Reorders retrieval candidates by query relevance
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Return at most `top_n` candidates, best first
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievalCandidate>,
        top_n: usize,
    ) -> Result<Vec<RetrievalCandidate>>;

    /// Strategy name for logging
    fn name(&self) -> &str;

    /// True for the truncation fallback; lets the caller shrink its
    /// per-query candidate count when no reranking will happen
    fn is_noop(&self) -> bool {
        false
    }
}

/// Fallback strategy: keep the head of the candidate list as-is
///
/// Accepts reduced precision in exchange for zero model cost.
pub struct NullReranker;

#[async_trait]
impl Reranker for NullReranker {
    async fn rerank(
        &self,
        _query: &str,
        mut candidates: Vec<RetrievalCandidate>,
        top_n: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        candidates.truncate(top_n);
        Ok(candidates)
    }

    fn name(&self) -> &str {
        "null"
    }

    fn is_noop(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: Vec<&'a str>,
}

#[derive(Deserialize)]
struct RerankResponse {
    scores: Vec<f32>,
}

/// Cross-encoder reranker backed by an HTTP scoring service
///
/// The service scores each (query, text) pair jointly and returns one scalar
/// per text.
pub struct CrossEncoderReranker {
    client: Client,
    endpoint: String,
}

impl CrossEncoderReranker {
    fn new(endpoint: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, endpoint })
    }

    async fn score(&self, query: &str, texts: Vec<&str>) -> Result<Vec<f32>> {
        let expected = texts.len();
        let url = format!("{}/rerank", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&RerankRequest { query, texts })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Rerank(format!("HTTP {}", response.status())));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| Error::Rerank(format!("failed to parse scores: {}", e)))?;
        if parsed.scores.len() != expected {
            return Err(Error::Rerank(format!(
                "scored {} of {} candidates",
                parsed.scores.len(),
                expected
            )));
        }
        Ok(parsed.scores)
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievalCandidate>,
        top_n: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let texts: Vec<&str> = candidates.iter().map(|c| c.chunk.text.as_str()).collect();
        let scores = self.score(query, texts).await?;
        Ok(rank_by_score(candidates, &scores, top_n))
    }

    fn name(&self) -> &str {
        "cross-encoder"
    }
}

/// Attach scores to candidates, sort descending, truncate to `top_n`
///
/// Ties keep the incoming candidate order.
pub(crate) fn rank_by_score(
    candidates: Vec<RetrievalCandidate>,
    scores: &[f32],
    top_n: usize,
) -> Vec<RetrievalCandidate> {
    let mut rescored: Vec<RetrievalCandidate> = candidates
        .into_iter()
        .zip(scores)
        .map(|(mut candidate, &score)| {
            candidate.score = score;
            candidate
        })
        .collect();
    rescored.sort_by(|a, b| b.score.total_cmp(&a.score));
    rescored.truncate(top_n);
    rescored
}

/// Select the reranking strategy once at startup
///
/// A configured endpoint that fails the health probe degrades to truncation
/// with a warning; no endpoint at all is a normal single-stage configuration.
pub async fn select_reranker(config: &RerankerConfig) -> Arc<dyn Reranker> {
    let Some(endpoint) = &config.endpoint else {
        tracing::info!("no reranker endpoint configured, using truncation");
        return Arc::new(NullReranker);
    };

    let reranker = match CrossEncoderReranker::new(endpoint.clone(), config.timeout_secs) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "failed to build reranker client, using truncation");
            return Arc::new(NullReranker);
        }
    };

    let health_url = format!("{}/health", endpoint.trim_end_matches('/'));
    match reranker.client.get(&health_url).send().await {
        Ok(response) if response.status().is_success() => {
            tracing::info!(endpoint = %endpoint, "cross-encoder reranker available");
            Arc::new(reranker)
        }
        Ok(response) => {
            tracing::warn!(
                endpoint = %endpoint,
                status = %response.status(),
                "reranker probe failed, using truncation"
            );
            Arc::new(NullReranker)
        }
        Err(e) => {
            tracing::warn!(endpoint = %endpoint, error = %e, "reranker unreachable, using truncation");
            Arc::new(NullReranker)
        }
    }
}
