use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::LlmProvider;
use crate::config::Pricing;
use crate::error::ForgeError;

/// Running cost of the model calls made during one run.
///
/// Costs are estimates: token counts are approximated as four characters per
/// token, priced with the configured per-1k rates.
#[derive(Debug)]
pub struct CostLedger {
    budget: f64,
    pricing: Pricing,
    spent: Mutex<f64>,
}

impl CostLedger {
    pub fn new(budget: f64, pricing: Pricing) -> Self {
        Self {
            budget,
            pricing,
            spent: Mutex::new(0.0),
        }
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn spent(&self) -> f64 {
        *self.spent.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail once the spend has reached the investment.
    pub fn check(&self) -> Result<(), ForgeError> {
        let spent = self.spent();
        if spent >= self.budget {
            return Err(ForgeError::BudgetExceeded {
                spent,
                budget: self.budget,
            });
        }
        Ok(())
    }

    /// Record a completed call and return its estimated cost.
    pub fn charge(&self, prompt: &str, completion: &str) -> f64 {
        let cost = estimate_tokens(prompt) / 1000.0 * self.pricing.prompt_per_1k
            + estimate_tokens(completion) / 1000.0 * self.pricing.completion_per_1k;
        let mut spent = self.spent.lock().unwrap_or_else(|e| e.into_inner());
        *spent += cost;
        cost
    }
}

fn estimate_tokens(text: &str) -> f64 {
    text.chars().count().div_ceil(4) as f64
}

/// Provider wrapper that refuses to call the model once the ledger is spent.
pub struct BudgetedProvider {
    inner: Arc<dyn LlmProvider>,
    ledger: Arc<CostLedger>,
}

impl BudgetedProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, ledger: Arc<CostLedger>) -> Self {
        Self { inner, ledger }
    }
}

#[async_trait]
impl LlmProvider for BudgetedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn ask(&self, prompt: &str) -> Result<String> {
        self.ledger.check()?;
        let reply = self.inner.ask(prompt).await?;
        let cost = self.ledger.charge(prompt, &reply);
        debug!(
            cost,
            spent = self.ledger.spent(),
            budget = self.ledger.budget(),
            "model call charged"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl LlmProvider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn ask(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }
    }

    fn pricing(per_1k: f64) -> Pricing {
        Pricing {
            prompt_per_1k: per_1k,
            completion_per_1k: per_1k,
        }
    }

    #[test]
    fn charge_uses_four_chars_per_token() {
        let ledger = CostLedger::new(10.0, pricing(1.0));
        let cost = ledger.charge(&"a".repeat(4000), "");
        assert!((cost - 1.0).abs() < 1e-9);
        assert!((ledger.spent() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn calls_stop_once_investment_is_spent() {
        let ledger = Arc::new(CostLedger::new(1.0, pricing(1.0)));
        let provider = BudgetedProvider::new(Arc::new(Echo), ledger.clone());

        // 2000 chars in, 2000 chars out: 500 + 500 tokens, $1.00 total
        let prompt = "x".repeat(2000);
        provider.ask(&prompt).await.unwrap();

        let err = provider.ask("again").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ForgeError>(),
            Some(ForgeError::BudgetExceeded { .. })
        ));
    }
}
