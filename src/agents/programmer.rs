use anyhow::Result;
use async_trait::async_trait;

use super::{Agent, AgentCore, Message, ReactMode, Role, Route, last_content};
use crate::actions::{ActionContext, ActionKind, FixCCode, FixCompileError, WriteAlgorithmCode};

const WATCH: &[ActionKind] = &[ActionKind::UserRequirement];

const ROUTES: &[Route] = &[
    Route::from_role(
        ActionKind::UserRequirement,
        Role::Human,
        ActionKind::WriteAlgorithmCode,
    ),
    Route::new(ActionKind::CompileCode, ActionKind::FixCompileError),
    Route::new(ActionKind::RunCode, ActionKind::FixCCode),
];

/// Writes the algorithm implementation and repairs it from test feedback.
pub struct CodeProgrammer {
    core: AgentCore,
}

impl CodeProgrammer {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(
                Role::CodeProgrammer,
                "C++ algorithm programmer",
                WATCH,
                ReactMode::ByRules(ROUTES),
            ),
        }
    }
}

impl Default for CodeProgrammer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for CodeProgrammer {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    async fn perform(&mut self, action: ActionKind, ctx: &ActionContext) -> Result<Message> {
        let input = last_content(&self.core)?;
        let code = match action {
            ActionKind::WriteAlgorithmCode => ctx.run(&WriteAlgorithmCode, input).await?,
            ActionKind::FixCompileError => ctx.run(&FixCompileError, input).await?,
            ActionKind::FixCCode => ctx.run(&FixCCode, input).await?,
            other => anyhow::bail!("{} cannot perform {}", self.core.role, other),
        };
        Ok(self.core.message(code, action))
    }
}
