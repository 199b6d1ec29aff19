use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{Agent, AgentCore, Message, ReactMode, Role, Route};
use crate::actions::{ActionContext, ActionKind, ApplyLoopStrategy};

const ROUTES: &[Route] = &[Route::from_role(
    ActionKind::CosimulateHls,
    Role::HlsBuildAssistant,
    ActionKind::ApplyLoopStrategy,
)];

pub const LOOPS_UNCHANGED: &str = "loop structure already suits synthesis";

/// Restructures the loops of a cosimulated design before pragmas are chosen.
///
/// Rewritten source goes back to the build assistant to be synthesized and
/// cosimulated again; unchanged source goes straight to the analyzer.
pub struct HlsCodeReviewer {
    core: AgentCore,
}

impl HlsCodeReviewer {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(
                Role::HlsCodeReviewer,
                "HLS loop structure reviewer",
                &[],
                ReactMode::ByRules(ROUTES),
            ),
        }
    }
}

impl Default for HlsCodeReviewer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for HlsCodeReviewer {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    async fn perform(&mut self, action: ActionKind, ctx: &ActionContext) -> Result<Message> {
        let role = self.core.role;
        match action {
            ActionKind::ApplyLoopStrategy => match ctx.run(&ApplyLoopStrategy, ()).await? {
                Some(code) => Ok(self.core.message(code, action).to(Role::HlsBuildAssistant)),
                None => {
                    info!(role = %role, "{}", LOOPS_UNCHANGED);
                    Ok(self
                        .core
                        .message(LOOPS_UNCHANGED, action)
                        .to(Role::HlsPerfAnalyzer))
                }
            },
            other => anyhow::bail!("{} cannot perform {}", role, other),
        }
    }
}
