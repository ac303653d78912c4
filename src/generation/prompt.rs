//! Prompt templates for grounded answer generation

use crate::types::Chunk;

/// Builds the grounded persona prompt for the park assistant
pub struct PromptBuilder;

impl PromptBuilder {
    /// Concatenate chunk texts, in the given order, into a context block
    pub fn build_context(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full answer prompt from the question and its context block
    pub fn build_answer_prompt(question: &str, context: &str) -> String {
        format!(
            "你是主题乐园的问答助手，只能根据下面提供的资料回答游客的问题。\n\
             如果资料中没有相关信息，请直接回答\"根据现有资料无法回答这个问题\"，\
             不要编造内容。\n\n\
             资料：\n{context}\n\n\
             问题：{question}\n\n\
             回答：",
            context = context,
            question = question
        )
    }
}
