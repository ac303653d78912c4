//! Multi-query expansion via the text-generation service

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::TextGenerator;

/// Expands one user question into several alternate phrasings
///
/// Expansion is best-effort: the retriever falls back to the original query
/// alone when `try_expand` errors.
pub struct QueryExpander {
    generator: Arc<dyn TextGenerator>,
    expansion_count: usize,
    temperature: f32,
}

impl QueryExpander {
    /// Create an expander requesting `expansion_count` alternate phrasings
    pub fn new(generator: Arc<dyn TextGenerator>, expansion_count: usize, temperature: f32) -> Self {
        Self {
            generator,
            expansion_count,
            temperature,
        }
    }

    /// Expand a query into a deduplicated set of phrasings
    ///
    /// The original query is always the first element, whatever the service
    /// returns. Errors from the external call propagate so the caller can log
    /// and degrade explicitly.
    pub async fn try_expand(&self, query: &str) -> Result<Vec<String>> {
        if query.trim().is_empty() {
            return Err(Error::llm("cannot expand an empty query"));
        }

        let prompt = self.build_prompt(query);
        let response = self.generator.complete(&prompt, self.temperature).await?;

        let mut queries = vec![query.to_string()];
        for candidate in response.split(['，', ',']) {
            let candidate = candidate.trim();
            if candidate.is_empty() {
                continue;
            }
            if queries.iter().any(|q| q == candidate) {
                continue;
            }
            queries.push(candidate.to_string());
            if queries.len() > self.expansion_count {
                break;
            }
        }
        Ok(queries)
    }

    fn build_prompt(&self, query: &str) -> String {
        format!(
            "你是一个检索查询改写助手。请为下面的问题生成{count}个意思相同但措辞不同的问法，\
             用于检索主题乐园知识库。只输出这{count}个问法，用逗号分隔，不要输出其他内容。\n\n\
             问题：{query}",
            count = self.expansion_count,
            query = query
        )
    }
}
