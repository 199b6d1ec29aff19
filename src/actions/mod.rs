mod code;
mod hls;
mod opt;
pub mod parse;
mod prompts;
mod test;

pub use code::{
    DesignIoReference, FixCCode, FixCompileError, TestCaseRequest, WriteAlgorithmCode, WriteTestCase,
};
pub use hls::{CosimulateHls, FixHlsCode, FixHlsOpt, RepairHlsCode, SynthesizeHls, SynthesizeOptimized};
pub use opt::{ApplyLoopStrategy, ApplyOptimizations, ChooseOptimizations, PreprocessHlsCode};
pub use test::{CompileCode, RunCode, WriteTestCode};

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, timeout};
use tracing::debug;

use crate::config::{AlgorithmInputs, BuildWorkspace};
use crate::llm::{LlmProvider, RetryConfig, retry_with_backoff};
use crate::runtime::CallRecorder;
use crate::tools::{FileStore, Toolchain};

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 300;

/// Every action an agent can perform, plus the human's initial requirement.
///
/// Messages carry their producer as one of these variants, and routing tables
/// are keyed on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    UserRequirement,
    WriteAlgorithmCode,
    FixCompileError,
    FixCCode,
    DesignIoReference,
    WriteTestCase,
    WriteTestCode,
    CompileCode,
    RunCode,
    PreprocessHlsCode,
    RepairHlsCode,
    FixHlsCode,
    SynthesizeHls,
    CosimulateHls,
    ApplyLoopStrategy,
    ChooseOptimizations,
    ApplyOptimizations,
    SynthesizeOptimized,
    FixHlsOpt,
}

impl ActionKind {
    pub const ALL: [ActionKind; 19] = [
        Self::UserRequirement,
        Self::WriteAlgorithmCode,
        Self::FixCompileError,
        Self::FixCCode,
        Self::DesignIoReference,
        Self::WriteTestCase,
        Self::WriteTestCode,
        Self::CompileCode,
        Self::RunCode,
        Self::PreprocessHlsCode,
        Self::RepairHlsCode,
        Self::FixHlsCode,
        Self::SynthesizeHls,
        Self::CosimulateHls,
        Self::ApplyLoopStrategy,
        Self::ChooseOptimizations,
        Self::ApplyOptimizations,
        Self::SynthesizeOptimized,
        Self::FixHlsOpt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::UserRequirement => "UserRequirement",
            Self::WriteAlgorithmCode => "WriteAlgorithmCode",
            Self::FixCompileError => "FixCompileError",
            Self::FixCCode => "FixCCode",
            Self::DesignIoReference => "DesignIoReference",
            Self::WriteTestCase => "WriteTestCase",
            Self::WriteTestCode => "WriteTestCode",
            Self::CompileCode => "CompileCode",
            Self::RunCode => "RunCode",
            Self::PreprocessHlsCode => "PreprocessHlsCode",
            Self::RepairHlsCode => "RepairHlsCode",
            Self::FixHlsCode => "FixHlsCode",
            Self::SynthesizeHls => "SynthesizeHls",
            Self::CosimulateHls => "CosimulateHls",
            Self::ApplyLoopStrategy => "ApplyLoopStrategy",
            Self::ChooseOptimizations => "ChooseOptimizations",
            Self::ApplyOptimizations => "ApplyOptimizations",
            Self::SynthesizeOptimized => "SynthesizeOptimized",
            Self::FixHlsOpt => "FixHlsOpt",
        }
    }

    /// Repair actions, counted against the optional per-agent repair cap.
    pub fn is_fix(self) -> bool {
        matches!(
            self,
            Self::FixCompileError | Self::FixCCode | Self::FixHlsCode | Self::FixHlsOpt
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .with_context(|| format!("unknown action kind '{}'", s))
    }
}

/// A single unit of work: one templated model call or one tool invocation.
///
/// Actions hold no state besides their configuration. Everything they touch
/// comes in through `input` and the [`ActionContext`].
#[async_trait]
pub trait Action: Send + Sync {
    const KIND: ActionKind;

    type Input: Send;
    type Output: Send;

    async fn run(&self, ctx: &ActionContext, input: Self::Input) -> Result<Self::Output>;
}

/// Collaborators and run-scoped state handed to every action.
pub struct ActionContext {
    llm: Arc<dyn LlmProvider>,
    pub toolchain: Toolchain,
    pub files: Arc<dyn FileStore>,
    pub workspace: BuildWorkspace,
    pub inputs: AlgorithmInputs,
    recorder: CallRecorder,
    retry: RetryConfig,
    llm_timeout: Duration,
    max_repairs: Option<usize>,
}

impl ActionContext {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        toolchain: Toolchain,
        files: Arc<dyn FileStore>,
        workspace: BuildWorkspace,
        inputs: AlgorithmInputs,
    ) -> Self {
        Self {
            llm,
            toolchain,
            files,
            workspace,
            inputs,
            recorder: CallRecorder::new(),
            retry: RetryConfig::default(),
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            max_repairs: None,
        }
    }

    pub fn with_llm_timeout(mut self, limit: Duration) -> Self {
        self.llm_timeout = limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_repairs(mut self, max_repairs: Option<usize>) -> Self {
        self.max_repairs = max_repairs;
        self
    }

    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    pub fn max_repairs(&self) -> Option<usize> {
        self.max_repairs
    }

    /// Run an action, counting the invocation.
    pub async fn run<A: Action>(&self, action: &A, input: A::Input) -> Result<A::Output> {
        self.recorder.record(A::KIND);
        debug!(action = %A::KIND, "running action");
        action
            .run(self, input)
            .await
            .with_context(|| format!("{} failed", A::KIND))
    }

    /// Ask the model, with retries on transient errors and a caller-side timeout.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        let limit = self.llm_timeout;
        retry_with_backoff(&self.retry, self.llm.name(), || async move {
            timeout(limit, self.llm.ask(prompt))
                .await
                .with_context(|| format!("model call timed out after {} seconds", limit.as_secs()))?
        })
        .await
    }

    pub async fn read(&self, path: &Path) -> Result<String> {
        self.files.read(path).await
    }

    pub async fn write(&self, path: &Path, content: &str) -> Result<()> {
        self.files.write(path, content).await
    }

    /// Read a file the run may legitimately lack, such as an optional header.
    pub(crate) async fn read_optional(&self, path: Option<&Path>) -> Result<String> {
        match path {
            Some(p) => self.read(p).await,
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolchainConfig;
    use crate::tools::LocalFileStore;

    struct SlowLlm;

    #[async_trait]
    impl LlmProvider for SlowLlm {
        async fn ask(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn configured_llm_timeout_bounds_model_calls() {
        let ctx = ActionContext::new(
            Arc::new(SlowLlm),
            Toolchain::from_config(&ToolchainConfig::default()),
            Arc::new(LocalFileStore::new()),
            BuildWorkspace::new("build"),
            AlgorithmInputs::new("sort"),
        )
        .with_llm_timeout(Duration::from_millis(20))
        .with_retry(RetryConfig::new(0, 1));

        let err = ctx.ask("hello").await.unwrap_err();
        assert!(format!("{:#}", err).contains("timed out after"));
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.name().parse::<ActionKind>().unwrap(), kind);
        }
        assert!("NotAnAction".parse::<ActionKind>().is_err());
    }

    #[test]
    fn only_repairs_count_as_fixes() {
        let fixes: Vec<_> = ActionKind::ALL.into_iter().filter(|k| k.is_fix()).collect();
        assert_eq!(
            fixes,
            vec![
                ActionKind::FixCompileError,
                ActionKind::FixCCode,
                ActionKind::FixHlsCode,
                ActionKind::FixHlsOpt,
            ]
        );
    }
}
