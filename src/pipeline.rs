use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::agents::{
    CodeProgrammer, HlsBuildAssistant, HlsCodeReviewer, HlsEngineer, HlsNormalizer,
    HlsPerfAnalyzer, TestDesigner, TestExecutor,
};
use crate::runtime::Team;

/// Which agents a run hires.
///
/// # Full pipeline
///
/// `PipelineKind::Full` generates and verifies C++ from the description, makes
/// it synthesizable, cosimulates it and applies optimization pragmas.
///
/// # Software pipeline
///
/// `PipelineKind::Software` stops once the generated code passes its test;
/// the pass verdict is broadcast instead of handed to the HLS engineer.
///
/// # Optimize pipeline
///
/// `PipelineKind::Optimize` starts from existing HLS source: it normalizes
/// the code, synthesizes and cosimulates it, then optimizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    #[default]
    Full,
    Software,
    Optimize,
}

impl PipelineKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Software => "software",
            Self::Optimize => "optimize",
        }
    }

    /// Whether the run needs existing HLS source instead of a generated one.
    pub fn needs_hls_source(self) -> bool {
        self == Self::Optimize
    }

    /// No test case is designed, so cosimulation relies on the user's testbench.
    pub fn needs_testbench(self) -> bool {
        self == Self::Optimize
    }

    /// Assemble the roster, in delivery order.
    ///
    /// `loop_review` adds the loop restructuring stage between cosimulation
    /// and pragma selection; the software pipeline ignores it.
    pub fn hire(self, loop_review: bool) -> Team {
        match self {
            Self::Full => hls_stages(
                Team::new()
                    .hire(CodeProgrammer::new())
                    .hire(TestDesigner::new())
                    .hire(TestExecutor::new()),
                loop_review,
            ),
            Self::Software => Team::new()
                .hire(CodeProgrammer::new())
                .hire(TestDesigner::new())
                .hire(TestExecutor::new().with_next_stage(None)),
            Self::Optimize => hls_stages(Team::new().hire(HlsNormalizer::new()), loop_review),
        }
    }
}

fn hls_stages(team: Team, loop_review: bool) -> Team {
    let team = team
        .hire(HlsEngineer::new())
        .hire(HlsBuildAssistant::new().with_loop_review(loop_review));
    let team = if loop_review {
        team.hire(HlsCodeReviewer::new())
    } else {
        team
    };
    team.hire(HlsPerfAnalyzer::new())
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PipelineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "software" | "sw" => Ok(Self::Software),
            "optimize" | "opt" => Ok(Self::Optimize),
            other => bail!(
                "unknown pipeline '{}' (expected full, software or optimize)",
                other
            ),
        }
    }
}
