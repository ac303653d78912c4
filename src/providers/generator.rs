//! Text-generation service trait

use async_trait::async_trait;

use crate::error::Result;

/// Trait for the external text-generation service
///
/// Used by the query expander and the answer generator. Single attempt per
/// call; the call either returns or errors, and each caller applies its own
/// failure policy at its boundary.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a prompt at the given temperature
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
