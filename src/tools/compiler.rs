use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Duration;
use tracing::info;

use super::process::run_process;
use super::{Compiler, ToolOutcome};
use crate::config::ToolchainConfig;

/// GCC-compatible compiler driver (`g++`, `gcc`, `clang++`)
pub struct GccCompiler {
    program: PathBuf,
    flags: Vec<String>,
    limit: Duration,
}

impl GccCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            flags: Vec::new(),
            limit: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self {
            program: PathBuf::from(&config.compiler),
            flags: config.compiler_flags.clone(),
            limit: Duration::from_secs(config.compile_timeout_secs),
        }
    }

    fn args(&self, sources: &[PathBuf], output: &Path) -> Vec<String> {
        let mut args = self.flags.clone();
        args.extend(sources.iter().map(|s| s.display().to_string()));
        args.push("-o".to_string());
        args.push(output.display().to_string());
        args
    }
}

#[async_trait]
impl Compiler for GccCompiler {
    async fn compile(&self, sources: &[PathBuf], output: &Path) -> Result<ToolOutcome> {
        let outcome = run_process(&self.program, &self.args(sources, output), None, self.limit).await?;
        info!(
            compiler = %self.program.display(),
            success = outcome.is_success(),
            "compilation finished"
        );
        Ok(outcome)
    }
}
