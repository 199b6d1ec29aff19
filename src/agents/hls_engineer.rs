use anyhow::Result;
use async_trait::async_trait;

use super::{Agent, AgentCore, Message, ReactMode, Role, Route, last_content};
use crate::actions::{ActionContext, ActionKind, FixHlsCode, RepairHlsCode};

const ROUTES: &[Route] = &[
    Route::new(ActionKind::RunCode, ActionKind::RepairHlsCode),
    Route::new(ActionKind::SynthesizeHls, ActionKind::FixHlsCode),
    Route::new(ActionKind::CosimulateHls, ActionKind::FixHlsCode),
];

/// Makes verified code synthesizable and repairs it from HLS tool logs.
///
/// Watches nothing; it only acts on messages addressed to it.
pub struct HlsEngineer {
    core: AgentCore,
}

impl HlsEngineer {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(
                Role::HlsEngineer,
                "Vitis HLS engineer",
                &[],
                ReactMode::ByRules(ROUTES),
            ),
        }
    }
}

impl Default for HlsEngineer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for HlsEngineer {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    async fn perform(&mut self, action: ActionKind, ctx: &ActionContext) -> Result<Message> {
        let code = match action {
            ActionKind::RepairHlsCode => ctx.run(&RepairHlsCode, ()).await?,
            ActionKind::FixHlsCode => ctx.run(&FixHlsCode, last_content(&self.core)?).await?,
            other => anyhow::bail!("{} cannot perform {}", self.core.role, other),
        };
        Ok(self.core.message(code, action))
    }
}
