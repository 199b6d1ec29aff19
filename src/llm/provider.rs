use anyhow::Result;
use async_trait::async_trait;

/// Trait for LLM providers
///
/// The pipeline only ever needs single-shot completions: one prompt in, one
/// reply out. Retrieval, sampling and provider-side retries are the
/// implementation's business.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a prompt and return the model's text reply
    async fn ask(&self, prompt: &str) -> Result<String>;

    /// Get the provider name
    fn name(&self) -> &str;
}
