mod anthropic;
mod budget;
mod provider;
mod retry;

pub use anthropic::{AnthropicProvider, OpenAIProvider};
pub use budget::{BudgetedProvider, CostLedger};
pub use provider::LlmProvider;
pub use retry::{RetryConfig, is_retryable_error, retry_with_backoff};
