//! Grounded answer generation

mod prompt;

pub use prompt::PromptBuilder;

use std::sync::Arc;

use crate::error::Result;
use crate::providers::TextGenerator;
use crate::types::Chunk;

/// Canned reply when retrieval produced nothing to ground an answer on
pub const NO_CONTEXT_ANSWER: &str = "根据现有资料无法回答这个问题。";

/// Prefix marking an answer that is really a generation failure message
pub const ANSWER_ERROR_PREFIX: &str = "[回答生成失败]";

/// Generates grounded answers from retrieved context chunks
pub struct AnswerGenerator {
    generator: Arc<dyn TextGenerator>,
    temperature: f32,
}

impl AnswerGenerator {
    /// Create a generator calling the text-generation service at `temperature`
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32) -> Self {
        Self {
            generator,
            temperature,
        }
    }

    /// Generate an answer grounded in `context_chunks`
    ///
    /// With no context chunks the external service is not called at all and
    /// the canned no-information answer is returned. Errors propagate so the
    /// caller can render them per its own policy.
    pub async fn generate(&self, query: &str, context_chunks: &[Chunk]) -> Result<String> {
        if context_chunks.is_empty() {
            tracing::debug!("no context chunks, short-circuiting to canned answer");
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }

        let context = PromptBuilder::build_context(context_chunks);
        let prompt = PromptBuilder::build_answer_prompt(query, &context);
        self.generator.complete(&prompt, self.temperature).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the prompt back and counts how often it was called
    struct CountingEchoGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for CountingEchoGenerator {
        async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(prompt.to_string())
        }

        fn name(&self) -> &str {
            "counting-echo"
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
            Err(Error::llm("timeout"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn empty_context_short_circuits_without_calling_service() {
        let stub = Arc::new(CountingEchoGenerator {
            calls: AtomicUsize::new(0),
        });
        let generator = AnswerGenerator::new(stub.clone(), 0.3);

        let answer = generator.generate("门票多少钱？", &[]).await.unwrap();
        assert_eq!(answer, NO_CONTEXT_ANSWER);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn answer_is_grounded_in_context() {
        let stub = Arc::new(CountingEchoGenerator {
            calls: AtomicUsize::new(0),
        });
        let generator = AnswerGenerator::new(stub.clone(), 0.3);

        let chunks = vec![Chunk::new("门票价格为每人499元。", "A.txt", 0)];
        let answer = generator.generate("门票多少钱？", &chunks).await.unwrap();
        assert!(answer.contains("499"));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn service_failure_propagates_to_caller() {
        let generator = AnswerGenerator::new(Arc::new(FailingGenerator), 0.3);
        let chunks = vec![Chunk::new("门票价格为每人499元。", "A.txt", 0)];
        assert!(generator.generate("门票多少钱？", &chunks).await.is_err());
    }
}
