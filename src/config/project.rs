use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROJECT_CONFIG_FILE: &str = ".nl2hls.toml";

/// Run configuration
///
/// Loaded from `.nl2hls.toml` in the current directory, falling back to
/// `~/.config/nl2hls/config.toml`, falling back to defaults. The first file
/// found wins; files are not merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// LLM provider to use (e.g., "anthropic", "openai")
    pub provider: Option<String>,

    /// Model to use
    pub model: Option<String>,

    /// Round budget for one run
    pub n_round: usize,

    /// Cost ceiling for model calls, in dollars
    pub investment: f64,

    pub llm_timeout_secs: u64,

    /// Evaluate the agents of a round concurrently
    pub concurrent_agents: bool,

    /// Cap on fix actions per agent per run
    pub max_repairs: Option<usize>,

    /// Restructure loops after the first passing cosimulation
    pub loop_review: bool,

    pub pricing: Pricing,
    pub toolchain: ToolchainConfig,
    pub workspace: WorkspaceConfig,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            n_round: 10,
            investment: 3.0,
            llm_timeout_secs: 300,
            concurrent_agents: true,
            max_repairs: None,
            loop_review: false,
            pricing: Pricing::default(),
            toolchain: ToolchainConfig::default(),
            workspace: WorkspaceConfig::default(),
        }
    }
}

impl ForgeConfig {
    /// Load configuration with precedence: project file > global file > defaults.
    pub fn load() -> Result<Self> {
        let global = std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".config/nl2hls/config.toml"));
        let candidates = [Some(PathBuf::from(PROJECT_CONFIG_FILE)), global];

        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                return Self::from_file(&path);
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}

/// Per-1k-token prices used to estimate model spend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            prompt_per_1k: 0.003,
            completion_per_1k: 0.015,
        }
    }
}

/// External compiler, runner and HLS tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub compiler: String,
    pub compiler_flags: Vec<String>,
    pub compile_timeout_secs: u64,
    pub run_timeout_secs: u64,
    pub hls_binary: String,
    pub hls_timeout_secs: u64,
    /// FPGA part passed to `set_part`
    pub part: String,
    pub clock_period_ns: f64,
    /// Lines of HLS log handed back on failure
    pub log_tail_lines: usize,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: "g++".to_string(),
            compiler_flags: vec!["-std=c++14".to_string(), "-O2".to_string()],
            compile_timeout_secs: 120,
            run_timeout_secs: 10,
            hls_binary: "vitis_hls".to_string(),
            hls_timeout_secs: 1800,
            part: "xcvu9p-flga2104-2-i".to_string(),
            clock_period_ns: 10.0,
            log_tail_lines: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub build_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from("build"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ForgeConfig::default();
        assert_eq!(config.n_round, 10);
        assert_eq!(config.investment, 3.0);
        assert!(config.concurrent_agents);
        assert!(config.max_repairs.is_none());
        assert!(!config.loop_review);
        assert_eq!(config.toolchain.compiler, "g++");
        assert_eq!(config.toolchain.run_timeout_secs, 10);
        assert_eq!(config.toolchain.log_tail_lines, 40);
        assert_eq!(config.workspace.build_dir, PathBuf::from("build"));
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let config: ForgeConfig = toml::from_str(
            r#"
            provider = "openai"
            n_round = 4
            max_repairs = 2

            [toolchain]
            part = "xc7z020clg400-1"
            "#,
        )
        .unwrap();

        assert_eq!(config.provider.as_deref(), Some("openai"));
        assert_eq!(config.n_round, 4);
        assert_eq!(config.max_repairs, Some(2));
        assert_eq!(config.toolchain.part, "xc7z020clg400-1");
        assert_eq!(config.toolchain.hls_binary, "vitis_hls");
        assert_eq!(config.investment, 3.0);
    }

    #[test]
    fn from_file_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "n_round = \"many\"").unwrap();

        let err = ForgeConfig::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.toml"));
    }
}
