use anyhow::Result;
use async_trait::async_trait;

use super::{Agent, AgentCore, Message, ReactMode, Role};
use crate::actions::{ActionContext, ActionKind, PreprocessHlsCode};

const WATCH: &[ActionKind] = &[ActionKind::UserRequirement];

const STEPS: &[ActionKind] = &[ActionKind::PreprocessHlsCode];

/// Rewrites existing HLS source into a canonical form, then hands it to the
/// build assistant.
pub struct HlsNormalizer {
    core: AgentCore,
}

impl HlsNormalizer {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(
                Role::HlsNormalizer,
                "HLS code normalizer",
                WATCH,
                ReactMode::ByOrder(STEPS),
            ),
        }
    }
}

impl Default for HlsNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for HlsNormalizer {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    async fn perform(&mut self, action: ActionKind, ctx: &ActionContext) -> Result<Message> {
        match action {
            ActionKind::PreprocessHlsCode => {
                ctx.run(&PreprocessHlsCode, ()).await?;
                Ok(self
                    .core
                    .message("preprocess work done", action)
                    .to(Role::HlsBuildAssistant))
            }
            other => anyhow::bail!("{} cannot perform {}", self.core.role, other),
        }
    }
}
