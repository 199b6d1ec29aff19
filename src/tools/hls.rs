use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::time::Duration;
use tracing::info;

use super::process::{run_process, tail_lines};
use super::{HlsTool, ToolOutcome};
use crate::config::ToolchainConfig;

const SOLUTION: &str = "solution1";

/// One HLS project: where it lives and what goes in it.
#[derive(Debug, Clone, PartialEq)]
pub struct HlsProject {
    /// Project directory; its parent is the tool's working directory
    pub dir: PathBuf,
    pub top: String,
    pub sources: Vec<PathBuf>,
    pub testbenches: Vec<PathBuf>,
}

impl HlsProject {
    fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "hls_proj".to_string())
    }

    fn work_dir(&self) -> PathBuf {
        match self.dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn script_path(&self, stage: Stage) -> PathBuf {
        self.work_dir()
            .join(format!("{}_{}.tcl", self.name(), stage.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Synthesis,
    Cosimulation,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Self::Synthesis => "csynth",
            Self::Cosimulation => "cosim",
        }
    }
}

/// Vitis HLS driven through generated Tcl scripts
pub struct VitisHls {
    program: PathBuf,
    part: String,
    clock_period_ns: f64,
    limit: Duration,
    log_tail_lines: usize,
}

impl VitisHls {
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self {
            program: PathBuf::from(&config.hls_binary),
            part: config.part.clone(),
            clock_period_ns: config.clock_period_ns,
            limit: Duration::from_secs(config.hls_timeout_secs),
            log_tail_lines: config.log_tail_lines,
        }
    }

    /// Tcl for one stage. Synthesis resets the project; cosimulation reopens
    /// it and reuses the synthesized solution.
    fn script(&self, project: &HlsProject, stage: Stage) -> String {
        let mut tcl = String::new();
        let reset = if stage == Stage::Synthesis { " -reset" } else { "" };

        let _ = writeln!(tcl, "open_project{} {}", reset, project.name());
        if stage == Stage::Synthesis {
            let _ = writeln!(tcl, "set_top {}", project.top);
            for src in &project.sources {
                let _ = writeln!(tcl, "add_files {{{}}}", src.display());
            }
        }
        for tb in &project.testbenches {
            let _ = writeln!(tcl, "add_files -tb {{{}}}", tb.display());
        }
        let _ = writeln!(tcl, "open_solution{} \"{}\" -flow_target vivado", reset, SOLUTION);
        if stage == Stage::Synthesis {
            let _ = writeln!(tcl, "set_part {{{}}}", self.part);
            let _ = writeln!(tcl, "create_clock -period {} -name default", self.clock_period_ns);
            let _ = writeln!(tcl, "csynth_design");
        } else {
            let _ = writeln!(tcl, "cosim_design");
        }
        let _ = writeln!(tcl, "exit");
        tcl
    }

    async fn run_stage(&self, project: &HlsProject, stage: Stage) -> Result<ToolOutcome> {
        let script = project.script_path(stage);
        tokio::fs::write(&script, self.script(project, stage))
            .await
            .with_context(|| format!("failed to write {}", script.display()))?;

        let args = vec!["-f".to_string(), script.display().to_string()];
        let outcome = run_process(&self.program, &args, Some(&project.work_dir()), self.limit).await?;
        info!(
            project = %project.name(),
            stage = stage.as_str(),
            success = outcome.is_success(),
            "hls stage finished"
        );

        Ok(match outcome {
            ToolOutcome::Failure {
                exit_code,
                diagnostics,
            } => ToolOutcome::Failure {
                exit_code,
                diagnostics: tail_lines(&diagnostics, self.log_tail_lines),
            },
            other => other,
        })
    }
}

#[async_trait]
impl HlsTool for VitisHls {
    async fn synthesize(&self, project: &HlsProject) -> Result<ToolOutcome> {
        self.run_stage(project, Stage::Synthesis).await
    }

    async fn cosimulate(&self, project: &HlsProject) -> Result<ToolOutcome> {
        self.run_stage(project, Stage::Cosimulation).await
    }
}

/// Absolute form of `path` for scripts that run in another directory.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> HlsProject {
        HlsProject {
            dir: PathBuf::from("/b/hls/hls_proj"),
            top: "fir".to_string(),
            sources: vec![PathBuf::from("/b/hls/hls.cpp")],
            testbenches: vec![PathBuf::from("/b/hls/fir_tb.cpp")],
        }
    }

    #[test]
    fn synthesis_script_resets_and_sets_top() {
        let tool = VitisHls::from_config(&ToolchainConfig::default());
        let tcl = tool.script(&project(), Stage::Synthesis);

        assert!(tcl.starts_with("open_project -reset hls_proj\n"));
        assert!(tcl.contains("set_top fir\n"));
        assert!(tcl.contains("add_files {/b/hls/hls.cpp}\n"));
        assert!(tcl.contains("set_part {xcvu9p-flga2104-2-i}\n"));
        assert!(tcl.contains("csynth_design\n"));
        assert!(!tcl.contains("cosim_design"));
        assert!(tcl.ends_with("exit\n"));
    }

    #[test]
    fn cosimulation_script_reuses_solution() {
        let tool = VitisHls::from_config(&ToolchainConfig::default());
        let tcl = tool.script(&project(), Stage::Cosimulation);

        assert!(tcl.starts_with("open_project hls_proj\n"));
        assert!(tcl.contains("add_files -tb {/b/hls/fir_tb.cpp}\n"));
        assert!(tcl.contains("cosim_design\n"));
        assert!(!tcl.contains("csynth_design"));
    }

    #[test]
    fn scripts_live_beside_the_project() {
        assert_eq!(
            project().script_path(Stage::Synthesis),
            PathBuf::from("/b/hls/hls_proj_csynth.tcl")
        );
    }
}
