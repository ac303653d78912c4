//! Ollama-backed providers for embeddings and text generation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::{normalize, EmbeddingProvider};
use super::generator::TextGenerator;

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Embedding provider backed by an Ollama server
///
/// Dimensionality is learned from a probe embedding at construction time, so a
/// missing model or unreachable server fails startup instead of corrupting the
/// index later.
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Connect to the embedding server and verify the model is loadable
    pub async fn connect(llm: &LlmConfig, embeddings: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()?;

        let mut embedder = Self {
            client,
            base_url: llm.base_url.clone(),
            model: embeddings.model.clone(),
            dimensions: 0,
        };

        // Probe embedding doubles as the fail-fast model load check.
        let probe = embedder.embed_raw("dimension probe").await.map_err(|e| {
            Error::embedding(format!(
                "embedding model '{}' failed to load: {}",
                embedder.model, e
            ))
        })?;
        if probe.is_empty() {
            return Err(Error::embedding(format!(
                "embedding model '{}' returned an empty vector",
                embedder.model
            )));
        }
        embedder.dimensions = probe.len();
        tracing::info!(
            model = %embedder.model,
            dimensions = embedder.dimensions,
            "embedding provider ready"
        );
        Ok(embedder)
    }

    async fn embed_raw(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(Error::embedding(format!(
                "embedding failed: HTTP {}",
                response.status()
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("failed to parse embedding response: {}", e)))?;
        Ok(embed_response.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            let mut vector = self.embed_raw(text).await?;
            if vector.len() != self.dimensions {
                return Err(Error::embedding(format!(
                    "expected {} dimensions, got {}",
                    self.dimensions,
                    vector.len()
                )));
            }
            normalize(&mut vector);
            embeddings.push(vector);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Text generator backed by an Ollama server
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    /// Create a new generator client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.generate_model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions { temperature },
        };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!(
                "generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("failed to parse generation response: {}", e)))?;
        Ok(generate_response.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
