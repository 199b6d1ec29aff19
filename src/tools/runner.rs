use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::time::Duration;
use tracing::info;

use super::process::run_process;
use super::{ExecutableRunner, ToolOutcome};

/// Runs executables as local child processes
pub struct ProcessRunner;

#[async_trait]
impl ExecutableRunner for ProcessRunner {
    async fn run(&self, executable: &Path, cwd: &Path, limit: Duration) -> Result<ToolOutcome> {
        // Relative program paths are ambiguous once cwd changes.
        let program = tokio::fs::canonicalize(executable)
            .await
            .with_context(|| format!("executable not found: {}", executable.display()))?;
        let outcome = run_process(&program, &[], Some(cwd), limit).await?;
        info!(
            executable = %executable.display(),
            success = outcome.is_success(),
            "execution finished"
        );
        Ok(outcome)
    }
}
