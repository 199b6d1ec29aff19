use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::ForgeConfig;
use crate::error::ForgeError;
use crate::forge::Forge;
use crate::llm::{AnthropicProvider, LlmProvider, OpenAIProvider, RetryConfig};
use crate::pipeline::PipelineKind;
use crate::record::{RunStore, SqliteRunStore};
use crate::tools::{FileStore, LocalFileStore, Toolchain};

/// Builder for constructing a [`Forge`] instance.
///
/// # Example
///
/// ```no_run
/// # use nl2hls::{AlgorithmInputs, Forge, PipelineKind};
/// # async fn example() -> Result<(), nl2hls::ForgeError> {
/// let forge = Forge::builder()
///     .anthropic(None)?
///     .pipeline(PipelineKind::Software)
///     .n_round(6)
///     .build()?;
///
/// let handle = forge.run(AlgorithmInputs::new("bubble sort of 8 ints")).await?;
/// println!("passed: {}", handle.output().await?.report.passed);
/// # Ok(())
/// # }
/// ```
pub struct ForgeBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    toolchain: Option<Toolchain>,
    files: Option<Arc<dyn FileStore>>,
    store: Option<Box<dyn RunStore>>,
    config: ForgeConfig,
    pipeline: PipelineKind,
    retry: RetryConfig,
}

impl ForgeBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            toolchain: None,
            files: None,
            store: None,
            config: ForgeConfig::default(),
            pipeline: PipelineKind::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Set a custom LLM provider.
    pub fn provider(mut self, provider: impl LlmProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Configure the Anthropic provider.
    ///
    /// If `model` is `None`, defaults to Claude Sonnet.
    pub fn anthropic(mut self, model: Option<&str>) -> Result<Self, ForgeError> {
        let p = match model {
            Some(m) => AnthropicProvider::new(m),
            None => AnthropicProvider::sonnet(),
        }
        .map_err(|e| ForgeError::Provider(format!("{:#}", e)))?;
        self.provider = Some(Arc::new(p));
        Ok(self)
    }

    /// Configure the OpenAI provider.
    ///
    /// If `model` is `None`, defaults to GPT-4o.
    pub fn openai(mut self, model: Option<&str>) -> Result<Self, ForgeError> {
        let p = match model {
            Some(m) => OpenAIProvider::new(m),
            None => OpenAIProvider::gpt4o(),
        }
        .map_err(|e| ForgeError::Provider(format!("{:#}", e)))?;
        self.provider = Some(Arc::new(p));
        Ok(self)
    }

    /// Configure a provider by name ("anthropic" or "openai").
    pub fn provider_by_name(self, name: &str, model: Option<&str>) -> Result<Self, ForgeError> {
        match name {
            "anthropic" => self.anthropic(model),
            "openai" => self.openai(model),
            _ => Err(ForgeError::Provider(format!("unknown provider: {}", name))),
        }
    }

    /// Replace the external tools (compiler, runner, HLS tool).
    ///
    /// Without this, the toolchain is built from the `[toolchain]` config
    /// section at [`build()`](Self::build) time.
    pub fn toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    pub fn file_store(mut self, files: impl FileStore + 'static) -> Self {
        self.files = Some(Arc::new(files));
        self
    }

    /// Set a custom run store.
    pub fn store(mut self, store: impl RunStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Save runs to SQLite at the default location (~/.nl2hls/runs.db).
    pub fn sqlite_store(mut self) -> Result<Self, ForgeError> {
        let store = SqliteRunStore::default_location().map_err(|e| {
            ForgeError::Storage(format!("failed to initialize run store: {:#}", e))
        })?;
        self.store = Some(Box::new(store));
        Ok(self)
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ForgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Apply settings from the configuration files.
    ///
    /// Loads config with precedence: project file > global file > defaults.
    /// Settings applied here can still be overridden by subsequent builder calls.
    pub fn from_config(mut self) -> Result<Self, ForgeError> {
        let config = ForgeConfig::load()
            .map_err(|e| ForgeError::Config(format!("failed to load configuration: {:#}", e)))?;
        debug!("loaded configuration");

        if let Some(ref provider_name) = config.provider {
            if self.provider.is_none() {
                self = self.provider_by_name(provider_name, config.model.as_deref())?;
            }
        }
        self.config = config;
        Ok(self)
    }

    pub fn pipeline(mut self, pipeline: PipelineKind) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Round budget.
    pub fn n_round(mut self, n_round: usize) -> Self {
        self.config.n_round = n_round;
        self
    }

    /// Cost ceiling for model calls, in dollars.
    pub fn investment(mut self, investment: f64) -> Self {
        self.config.investment = investment;
        self
    }

    /// Evaluate the agents of a round concurrently (default) or in roster order.
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.config.concurrent_agents = concurrent;
        self
    }

    pub fn max_repairs(mut self, max_repairs: Option<usize>) -> Self {
        self.config.max_repairs = max_repairs;
        self
    }

    /// Hire the loop restructuring reviewer in the HLS pipelines.
    pub fn loop_review(mut self, enabled: bool) -> Self {
        self.config.loop_review = enabled;
        self
    }

    pub fn build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workspace.build_dir = dir.into();
        self
    }

    /// Retry policy for model calls.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Build the [`Forge`] instance.
    ///
    /// Fails if no provider has been configured or the budgets are unusable.
    pub fn build(self) -> Result<Forge, ForgeError> {
        let provider = self
            .provider
            .ok_or_else(|| ForgeError::Config("no LLM provider configured".to_string()))?;

        if self.config.n_round == 0 {
            return Err(ForgeError::Config(
                "round budget must be at least 1".to_string(),
            ));
        }
        if self.config.investment.is_nan() || self.config.investment <= 0.0 {
            return Err(ForgeError::Config(format!(
                "investment must be positive, got {}",
                self.config.investment
            )));
        }

        let toolchain = self
            .toolchain
            .unwrap_or_else(|| Toolchain::from_config(&self.config.toolchain));
        let files = self
            .files
            .unwrap_or_else(|| Arc::new(LocalFileStore::new()));

        Ok(Forge::from_parts(
            provider,
            toolchain,
            files,
            self.store,
            self.config,
            self.pipeline,
            self.retry,
        ))
    }
}

impl Default for ForgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
