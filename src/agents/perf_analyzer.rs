use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{Agent, AgentCore, Message, ReactMode, Role, Route, last_content};
use crate::actions::parse::{parse_opt_list, render_opt_list};
use crate::actions::{ActionContext, ActionKind, ApplyOptimizations, ChooseOptimizations, FixHlsOpt};

const ROUTES: &[Route] = &[
    Route::new(ActionKind::CosimulateHls, ActionKind::ChooseOptimizations),
    Route::new(ActionKind::ApplyLoopStrategy, ActionKind::ChooseOptimizations),
    Route::from_role(
        ActionKind::ChooseOptimizations,
        Role::HlsPerfAnalyzer,
        ActionKind::ApplyOptimizations,
    ),
    Route::new(ActionKind::SynthesizeOptimized, ActionKind::FixHlsOpt),
];

pub const NO_OPTIMIZATION: &str = "no optimization applies; design is final";

/// Chooses and applies optimization pragmas, and repairs them when the
/// optimized design fails to synthesize.
pub struct HlsPerfAnalyzer {
    core: AgentCore,
}

impl HlsPerfAnalyzer {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(
                Role::HlsPerfAnalyzer,
                "HLS performance analyzer",
                &[],
                ReactMode::ByRules(ROUTES),
            ),
        }
    }
}

impl Default for HlsPerfAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for HlsPerfAnalyzer {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    async fn perform(&mut self, action: ActionKind, ctx: &ActionContext) -> Result<Message> {
        let role = self.core.role;
        let message = match action {
            ActionKind::ChooseOptimizations => {
                let chosen = ctx.run(&ChooseOptimizations, ()).await?;
                if chosen.is_empty() {
                    info!(role = %role, "{}", NO_OPTIMIZATION);
                    self.core.message(NO_OPTIMIZATION, action).passed()
                } else {
                    self.core.message(render_opt_list(&chosen), action).to(role)
                }
            }
            ActionKind::ApplyOptimizations => {
                let chosen = parse_opt_list(&last_content(&self.core)?);
                ctx.run(&ApplyOptimizations, chosen.clone()).await?;
                self.core
                    .message(
                        format!("applied optimizations {}", render_opt_list(&chosen)),
                        action,
                    )
                    .to(Role::HlsBuildAssistant)
            }
            ActionKind::FixHlsOpt => {
                let code = ctx.run(&FixHlsOpt, last_content(&self.core)?).await?;
                self.core.message(code, action)
            }
            other => anyhow::bail!("{} cannot perform {}", role, other),
        };
        Ok(message)
    }
}
