use anyhow::Result;
use async_trait::async_trait;

use super::{Agent, AgentCore, Message, ReactMode, Role, latest_content};
use crate::actions::{ActionContext, ActionKind, DesignIoReference, TestCaseRequest, WriteTestCase};

const WATCH: &[ActionKind] = &[ActionKind::UserRequirement];

const STEPS: &[ActionKind] = &[ActionKind::DesignIoReference, ActionKind::WriteTestCase];

/// Derives reference vectors from the requirement, then a test case from them.
pub struct TestDesigner {
    core: AgentCore,
    reference: DesignIoReference,
}

impl TestDesigner {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(
                Role::TestDesigner,
                "C++ test designer",
                WATCH,
                ReactMode::ByOrder(STEPS),
            ),
            reference: DesignIoReference::default(),
        }
    }

    /// Number of reference vectors to design.
    pub fn with_cases(mut self, cases: usize) -> Self {
        self.reference.cases = cases;
        self
    }
}

impl Default for TestDesigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for TestDesigner {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    async fn perform(&mut self, action: ActionKind, ctx: &ActionContext) -> Result<Message> {
        let description = latest_content(&self.core, ActionKind::UserRequirement)?;
        let content = match action {
            ActionKind::DesignIoReference => ctx.run(&self.reference, description).await?,
            ActionKind::WriteTestCase => {
                let reference = latest_content(&self.core, ActionKind::DesignIoReference)?;
                ctx.run(
                    &WriteTestCase,
                    TestCaseRequest {
                        description,
                        reference,
                    },
                )
                .await?
            }
            other => anyhow::bail!("{} cannot perform {}", self.core.role, other),
        };
        Ok(self.core.message(content, action))
    }
}
