use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{Agent, AgentCore, Message, ReactMode, Role, latest_content};
use crate::actions::{ActionContext, ActionKind, CompileCode, RunCode, WriteTestCode};

const WATCH: &[ActionKind] = &[
    ActionKind::WriteTestCase,
    ActionKind::FixCompileError,
    ActionKind::FixCCode,
];

const STEPS: &[ActionKind] = &[
    ActionKind::WriteTestCode,
    ActionKind::CompileCode,
    ActionKind::RunCode,
];

pub const CODE_PASSED: &str = "algorithm code passed!";

/// Builds the harness, compiles and runs it, and reports the verdict.
///
/// Failures go back to the programmer. A pass goes to the next stage, or is
/// broadcast when there is none.
pub struct TestExecutor {
    core: AgentCore,
    next_stage: Option<Role>,
}

impl TestExecutor {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(
                Role::TestExecutor,
                "C++ test executor",
                WATCH,
                ReactMode::ByOrder(STEPS),
            ),
            next_stage: Some(Role::HlsEngineer),
        }
    }

    pub fn with_next_stage(mut self, next_stage: Option<Role>) -> Self {
        self.next_stage = next_stage;
        self
    }
}

impl Default for TestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for TestExecutor {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    async fn perform(&mut self, action: ActionKind, ctx: &ActionContext) -> Result<Message> {
        let message = match action {
            ActionKind::WriteTestCode => {
                let test_case = latest_content(&self.core, ActionKind::WriteTestCase)?;
                let harness = ctx.run(&WriteTestCode, test_case).await?;
                self.core.message(harness, action)
            }
            ActionKind::CompileCode => {
                let outcome = ctx.run(&CompileCode, ()).await?;
                if outcome.is_success() {
                    self.core.message("compilation succeeded", action)
                } else {
                    self.core
                        .message(outcome.diagnostics(), action)
                        .to(Role::CodeProgrammer)
                        .failed()
                }
            }
            ActionKind::RunCode => {
                let outcome = ctx.run(&RunCode, ()).await?;
                if outcome.is_success() {
                    info!(role = %self.core.role, "{}", CODE_PASSED);
                    let message = self.core.message(CODE_PASSED, action).passed();
                    match self.next_stage {
                        Some(role) => message.to(role),
                        None => message,
                    }
                } else {
                    self.core
                        .message(outcome.diagnostics(), action)
                        .to(Role::CodeProgrammer)
                        .failed()
                }
            }
            other => anyhow::bail!("{} cannot perform {}", self.core.role, other),
        };
        Ok(message)
    }
}
