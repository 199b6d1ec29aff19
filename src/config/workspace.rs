use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use tracing::debug;

use crate::error::ForgeError;

const HEADER_PATTERNS: &[&str] = &["*.h", "*.hpp"];
const TESTBENCH_PATTERNS: &[&str] = &["*_tb.cpp", "*_tb.c", "tb_*.cpp"];

/// Every artifact path of one run, derived from the build directory.
///
/// ```text
/// build/
///   impl/  impl.cpp test_case.cpp impl_test.cpp impl_test <header>
///   ref/   reference.txt
///   hls/   hls.cpp hls_baseline.cpp hls_opt.cpp hls_tb.cpp <header> <testbench>
///          hls_proj/ hls_opt_proj/
/// ```
#[derive(Debug, Clone)]
pub struct BuildWorkspace {
    root: PathBuf,
}

impl BuildWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn impl_dir(&self) -> PathBuf {
        self.root.join("impl")
    }

    /// Generated algorithm implementation
    pub fn impl_file(&self) -> PathBuf {
        self.impl_dir().join("impl.cpp")
    }

    /// Test harness combining the test case with a `main`
    pub fn test_file(&self) -> PathBuf {
        self.impl_dir().join("impl_test.cpp")
    }

    /// The designed test case on its own, without any `#include`
    pub fn test_case_file(&self) -> PathBuf {
        self.impl_dir().join("test_case.cpp")
    }

    pub fn test_exe(&self) -> PathBuf {
        self.impl_dir().join("impl_test")
    }

    pub fn reference_file(&self) -> PathBuf {
        self.root.join("ref").join("reference.txt")
    }

    pub fn hls_dir(&self) -> PathBuf {
        self.root.join("hls")
    }

    /// Synthesizable source
    pub fn hls_src(&self) -> PathBuf {
        self.hls_dir().join("hls.cpp")
    }

    /// Synthesizable source as it was before loop restructuring
    pub fn hls_baseline(&self) -> PathBuf {
        self.hls_dir().join("hls_baseline.cpp")
    }

    /// Generated cosimulation testbench, used when the user gave none
    pub fn hls_tb(&self) -> PathBuf {
        self.hls_dir().join("hls_tb.cpp")
    }

    /// Synthesizable source with optimization pragmas
    pub fn hls_opt(&self) -> PathBuf {
        self.hls_dir().join("hls_opt.cpp")
    }

    pub fn hls_project(&self) -> PathBuf {
        self.hls_dir().join("hls_proj")
    }

    pub fn hls_opt_project(&self) -> PathBuf {
        self.hls_dir().join("hls_opt_proj")
    }

    /// Where a staged copy of an input file lives inside `dir`.
    pub fn staged(dir: &Path, input: &Path) -> PathBuf {
        match input.file_name() {
            Some(name) => dir.join(name),
            None => dir.join(input),
        }
    }

    /// Create the directory tree.
    pub async fn prepare(&self) -> Result<(), ForgeError> {
        for dir in [
            self.impl_dir(),
            self.root.join("ref"),
            self.hls_dir(),
        ] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| ForgeError::Io {
                    path: dir.clone(),
                    source,
                })?;
        }
        debug!(root = %self.root.display(), "build workspace prepared");
        Ok(())
    }

    /// Copy the header next to both sources and the testbench next to the
    /// HLS source so relative `#include`s resolve.
    pub async fn stage_inputs(&self, inputs: &AlgorithmInputs) -> Result<(), ForgeError> {
        if let Some(header) = &inputs.header {
            copy_into(header, &self.impl_dir()).await?;
            copy_into(header, &self.hls_dir()).await?;
        }
        if let Some(testbench) = &inputs.testbench {
            copy_into(testbench, &self.hls_dir()).await?;
        }
        Ok(())
    }
}

async fn copy_into(file: &Path, dir: &Path) -> Result<(), ForgeError> {
    let target = BuildWorkspace::staged(dir, file);
    tokio::fs::copy(file, &target)
        .await
        .map_err(|source| ForgeError::Io {
            path: file.to_path_buf(),
            source,
        })?;
    debug!(from = %file.display(), to = %target.display(), "staged input");
    Ok(())
}

/// The user-provided material a run starts from.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmInputs {
    /// Natural-language algorithm description
    pub description: String,
    pub description_path: PathBuf,
    pub header: Option<PathBuf>,
    pub testbench: Option<PathBuf>,
    /// Existing HLS source, for runs that skip code generation
    pub hls_source: Option<PathBuf>,
    /// Top function name; extracted from the implementation when unset
    pub top_function: Option<String>,
}

impl AlgorithmInputs {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Read the description file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ForgeError> {
        let path = path.as_ref();
        let description = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ForgeError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            description,
            description_path: path.to_path_buf(),
            ..Self::default()
        })
    }

    pub fn with_header(mut self, header: impl Into<PathBuf>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_testbench(mut self, testbench: impl Into<PathBuf>) -> Self {
        self.testbench = Some(testbench.into());
        self
    }

    pub fn with_hls_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.hls_source = Some(source.into());
        self
    }

    pub fn with_top_function(mut self, name: impl Into<String>) -> Self {
        self.top_function = Some(name.into());
        self
    }

    /// Fill in a missing header or testbench from files that sit next to the
    /// description.
    pub fn discover(mut self) -> Result<Self> {
        let dir = match self.description_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if self.header.is_none() {
            self.header = first_match(&dir, HEADER_PATTERNS)?;
        }
        if self.testbench.is_none() {
            self.testbench = first_match(&dir, TESTBENCH_PATTERNS)?;
        }
        Ok(self)
    }

    /// Name of the header as it appears in `#include "..."`.
    pub fn header_name(&self) -> Option<String> {
        self.header
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

fn first_match(dir: &Path, patterns: &[&str]) -> Result<Option<PathBuf>> {
    for pattern in patterns {
        let full_pattern = format!("{}/{}", dir.display(), pattern);
        let entries =
            glob(&full_pattern).with_context(|| format!("invalid glob pattern: {}", full_pattern))?;

        // glob yields paths in alphabetical order
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    debug!(path = %path.display(), "discovered input");
                    return Ok(Some(path));
                }
                Ok(_) => {}
                Err(e) => debug!("glob entry error: {}", e),
            }
        }
    }
    Ok(None)
}
