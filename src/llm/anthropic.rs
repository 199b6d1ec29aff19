use anyhow::{Context, Result};
use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, ChatRole, MessageType};
use tracing::warn;

use super::LlmProvider;

const DEFAULT_MAX_TOKENS: u32 = 8192;
const SYSTEM_PROMPT: &str = "You are an expert C++ and Vitis HLS engineer. \
Follow the output format requested in each prompt exactly.";

/// Parameters for the shared LLM completion implementation
struct AskParams<'a> {
    backend: LLMBackend,
    provider_name: &'a str,
    api_key: &'a str,
    model: &'a str,
    max_tokens: u32,
    prompt: &'a str,
}

/// Build the llm crate client from shared parameters.
fn build_llm_client(params: &AskParams<'_>) -> Result<Box<dyn llm::LLMProvider>> {
    LLMBuilder::new()
        .backend(params.backend.clone())
        .api_key(params.api_key)
        .model(params.model)
        .system(SYSTEM_PROMPT)
        .max_tokens(params.max_tokens)
        .build()
        .context("failed to build LLM client")
}

/// Shared implementation for providers backed by the `llm` crate.
///
/// No deadline here; callers bound the call with the configured model timeout.
async fn ask_impl(params: AskParams<'_>) -> Result<String> {
    let llm = build_llm_client(&params)?;
    let messages = vec![ChatMessage {
        role: ChatRole::User,
        message_type: MessageType::Text,
        content: params.prompt.to_string(),
    }];

    let response = llm
        .chat(&messages)
        .await
        .with_context(|| format!("failed to call {} API", params.provider_name))?;

    let text = response.text().unwrap_or_else(|| {
        warn!("{} API returned empty response text", params.provider_name);
        String::new()
    });

    Ok(text)
}

/// Anthropic LLM provider using the llm crate
pub struct AnthropicProvider {
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with the specified model
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set")?;
        Ok(Self {
            model: model.into(),
            api_key,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Create a provider using Claude Sonnet
    pub fn sonnet() -> Result<Self> {
        Self::new("claude-sonnet-4-20250514")
    }

    fn params<'a>(&'a self, prompt: &'a str) -> AskParams<'a> {
        AskParams {
            backend: LLMBackend::Anthropic,
            provider_name: "Anthropic",
            api_key: &self.api_key,
            model: &self.model,
            max_tokens: self.max_tokens,
            prompt,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn ask(&self, prompt: &str) -> Result<String> {
        ask_impl(self.params(prompt)).await
    }
}

/// OpenAI LLM provider using the llm crate
pub struct OpenAIProvider {
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the specified model
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;
        Ok(Self {
            model: model.into(),
            api_key,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Create a provider using GPT-4o
    pub fn gpt4o() -> Result<Self> {
        Self::new("gpt-4o")
    }

    fn params<'a>(&'a self, prompt: &'a str) -> AskParams<'a> {
        AskParams {
            backend: LLMBackend::OpenAI,
            provider_name: "OpenAI",
            api_key: &self.api_key,
            model: &self.model,
            max_tokens: self.max_tokens,
            prompt,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn ask(&self, prompt: &str) -> Result<String> {
        ask_impl(self.params(prompt)).await
    }
}
