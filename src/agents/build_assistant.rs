use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{Agent, AgentCore, Message, ReactMode, Role, Route};
use crate::actions::{ActionContext, ActionKind, CosimulateHls, SynthesizeHls, SynthesizeOptimized};

const WATCH: &[ActionKind] = &[
    ActionKind::RepairHlsCode,
    ActionKind::FixHlsCode,
    ActionKind::FixHlsOpt,
];

const ROUTES: &[Route] = &[
    Route::new(ActionKind::PreprocessHlsCode, ActionKind::SynthesizeHls),
    Route::new(ActionKind::RepairHlsCode, ActionKind::SynthesizeHls),
    Route::new(ActionKind::FixHlsCode, ActionKind::SynthesizeHls),
    Route::new(ActionKind::ApplyLoopStrategy, ActionKind::SynthesizeHls),
    Route::from_role(
        ActionKind::SynthesizeHls,
        Role::HlsBuildAssistant,
        ActionKind::CosimulateHls,
    ),
    Route::new(ActionKind::ApplyOptimizations, ActionKind::SynthesizeOptimized),
    Route::new(ActionKind::FixHlsOpt, ActionKind::SynthesizeOptimized),
];

pub const SYNTH_PASSED: &str = "hls source synthesized!";
pub const COSIM_PASSED: &str = "cosimulation passed!";
pub const OPT_SYNTH_PASSED: &str = "optimized design synthesized!";

/// Drives the HLS tool: synthesis, cosimulation and optimized synthesis.
///
/// A passing synthesis is addressed back to itself so cosimulation runs the
/// next round. With loop review on, the first passing cosimulation goes to
/// the code reviewer instead of the analyzer.
pub struct HlsBuildAssistant {
    core: AgentCore,
    loop_review: bool,
}

impl HlsBuildAssistant {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(
                Role::HlsBuildAssistant,
                "Vitis HLS build assistant",
                WATCH,
                ReactMode::ByRules(ROUTES),
            ),
            loop_review: false,
        }
    }

    pub fn with_loop_review(mut self, enabled: bool) -> Self {
        self.loop_review = enabled;
        self
    }

    fn after_cosim(&self) -> Role {
        let reviewed = self.core.memory.latest_by(ActionKind::ApplyLoopStrategy).is_some();
        if self.loop_review && !reviewed {
            Role::HlsCodeReviewer
        } else {
            Role::HlsPerfAnalyzer
        }
    }
}

impl Default for HlsBuildAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for HlsBuildAssistant {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    async fn perform(&mut self, action: ActionKind, ctx: &ActionContext) -> Result<Message> {
        let role = self.core.role;
        let (outcome, on_pass, on_fail) = match action {
            ActionKind::SynthesizeHls => (
                ctx.run(&SynthesizeHls, ()).await?,
                Some(role),
                Role::HlsEngineer,
            ),
            ActionKind::CosimulateHls => (
                ctx.run(&CosimulateHls, ()).await?,
                Some(self.after_cosim()),
                Role::HlsEngineer,
            ),
            ActionKind::SynthesizeOptimized => (
                ctx.run(&SynthesizeOptimized, ()).await?,
                None,
                Role::HlsPerfAnalyzer,
            ),
            other => anyhow::bail!("{} cannot perform {}", role, other),
        };

        if !outcome.is_success() {
            return Ok(self
                .core
                .message(outcome.diagnostics(), action)
                .to(on_fail)
                .failed());
        }

        let verdict = match action {
            ActionKind::SynthesizeHls => SYNTH_PASSED,
            ActionKind::CosimulateHls => COSIM_PASSED,
            _ => OPT_SYNTH_PASSED,
        };
        info!(role = %role, "{}", verdict);

        let message = self.core.message(verdict, action).passed();
        Ok(match on_pass {
            Some(target) => message.to(target),
            None => message,
        })
    }
}
