mod compiler;
mod file;
mod hls;
mod process;
mod runner;

pub use compiler::GccCompiler;
pub use file::{FileStore, LocalFileStore};
pub use hls::{HlsProject, VitisHls};
pub(crate) use hls::absolute;
pub use runner::ProcessRunner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::config::ToolchainConfig;

/// Result of invoking an external tool.
///
/// Expected failures are data: a non-zero exit or a timeout is an outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolOutcome {
    Success { output: String },
    Failure {
        exit_code: Option<i32>,
        diagnostics: String,
    },
    TimedOut { after_secs: u64 },
}

impl ToolOutcome {
    pub fn failure(diagnostics: impl Into<String>) -> Self {
        Self::Failure {
            exit_code: Some(1),
            diagnostics: diagnostics.into(),
        }
    }

    pub fn success(output: impl Into<String>) -> Self {
        Self::Success {
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Text to hand to a repair action.
    pub fn diagnostics(&self) -> String {
        match self {
            Self::Success { output } => output.clone(),
            Self::Failure {
                exit_code,
                diagnostics,
            } => match exit_code {
                Some(code) if diagnostics.trim().is_empty() => {
                    format!("process exited with code {}", code)
                }
                None if diagnostics.trim().is_empty() => {
                    "process terminated by signal".to_string()
                }
                _ => diagnostics.clone(),
            },
            Self::TimedOut { after_secs } => format!(
                "timed out after {} seconds; the process was killed",
                after_secs
            ),
        }
    }
}

/// Compiles C/C++ sources into an executable
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, sources: &[PathBuf], output: &Path) -> Result<ToolOutcome>;
}

/// Runs a compiled executable
#[async_trait]
pub trait ExecutableRunner: Send + Sync {
    /// Run with a wall-clock limit; the outcome carries stderr followed by stdout.
    async fn run(&self, executable: &Path, cwd: &Path, limit: Duration) -> Result<ToolOutcome>;
}

/// High-level synthesis toolchain
#[async_trait]
pub trait HlsTool: Send + Sync {
    async fn synthesize(&self, project: &HlsProject) -> Result<ToolOutcome>;
    async fn cosimulate(&self, project: &HlsProject) -> Result<ToolOutcome>;
}

/// The external tools a run drives.
#[derive(Clone)]
pub struct Toolchain {
    pub compiler: Arc<dyn Compiler>,
    pub runner: Arc<dyn ExecutableRunner>,
    pub hls: Arc<dyn HlsTool>,
    pub run_timeout: Duration,
}

impl Toolchain {
    pub fn new(
        compiler: Arc<dyn Compiler>,
        runner: Arc<dyn ExecutableRunner>,
        hls: Arc<dyn HlsTool>,
    ) -> Self {
        Self {
            compiler,
            runner,
            hls,
            run_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_run_timeout(mut self, limit: Duration) -> Self {
        self.run_timeout = limit;
        self
    }

    /// `g++`, local process execution and Vitis HLS, as configured.
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(
            Arc::new(GccCompiler::from_config(config)),
            Arc::new(ProcessRunner),
            Arc::new(VitisHls::from_config(config)),
        )
        .with_run_timeout(Duration::from_secs(config.run_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_explain_silent_failures() {
        let silent = ToolOutcome::Failure {
            exit_code: Some(2),
            diagnostics: String::new(),
        };
        assert_eq!(silent.diagnostics(), "process exited with code 2");

        let timed_out = ToolOutcome::TimedOut { after_secs: 10 };
        assert!(timed_out.diagnostics().contains("10 seconds"));
        assert!(!timed_out.is_success());
    }

    #[test]
    fn failure_diagnostics_pass_through() {
        let outcome = ToolOutcome::failure("impl.cpp:3: error: expected ';'");
        assert_eq!(outcome.diagnostics(), "impl.cpp:3: error: expected ';'");
    }
}
