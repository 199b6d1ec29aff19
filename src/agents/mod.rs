mod build_assistant;
mod code_reviewer;
mod hls_engineer;
mod memory;
mod message;
mod normalizer;
mod perf_analyzer;
mod programmer;
mod test_designer;
mod test_executor;

pub use build_assistant::{COSIM_PASSED, HlsBuildAssistant, OPT_SYNTH_PASSED, SYNTH_PASSED};
pub use code_reviewer::{HlsCodeReviewer, LOOPS_UNCHANGED};
pub use hls_engineer::HlsEngineer;
pub use memory::Memory;
pub use message::{Destination, Message, MessageId, MessageStatus};
pub use normalizer::HlsNormalizer;
pub use perf_analyzer::{HlsPerfAnalyzer, NO_OPTIMIZATION};
pub use programmer::CodeProgrammer;
pub use test_designer::TestDesigner;
pub use test_executor::{CODE_PASSED, TestExecutor};

use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::actions::{ActionContext, ActionKind};
use crate::error::ForgeError;

/// Identity of a message sender or recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Human,
    CodeProgrammer,
    TestDesigner,
    TestExecutor,
    HlsNormalizer,
    HlsEngineer,
    HlsBuildAssistant,
    HlsCodeReviewer,
    HlsPerfAnalyzer,
}

impl Role {
    pub const ALL: [Role; 9] = [
        Self::Human,
        Self::CodeProgrammer,
        Self::TestDesigner,
        Self::TestExecutor,
        Self::HlsNormalizer,
        Self::HlsEngineer,
        Self::HlsBuildAssistant,
        Self::HlsCodeReviewer,
        Self::HlsPerfAnalyzer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::CodeProgrammer => "CodeProgrammer",
            Self::TestDesigner => "TestDesigner",
            Self::TestExecutor => "TestExecutor",
            Self::HlsNormalizer => "HlsNormalizer",
            Self::HlsEngineer => "HlsEngineer",
            Self::HlsBuildAssistant => "HlsBuildAssistant",
            Self::HlsCodeReviewer => "HlsCodeReviewer",
            Self::HlsPerfAnalyzer => "HlsPerfAnalyzer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|role| role.name().eq_ignore_ascii_case(s))
            .with_context(|| format!("unknown role '{}'", s))
    }
}

/// One transition: a message produced by `on` (optionally only from `from`)
/// makes the agent run `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub on: ActionKind,
    pub from: Option<Role>,
    pub run: ActionKind,
}

impl Route {
    pub const fn new(on: ActionKind, run: ActionKind) -> Self {
        Self { on, from: None, run }
    }

    pub const fn from_role(on: ActionKind, from: Role, run: ActionKind) -> Self {
        Self {
            on,
            from: Some(from),
            run,
        }
    }

    fn matches(&self, message: &Message) -> bool {
        self.on == message.produced_by && self.from.is_none_or(|r| r == message.sender)
    }
}

/// How an agent picks what to do when it receives a message
#[derive(Debug, Clone, Copy)]
pub enum ReactMode {
    /// Look the most recent message up in a routing table
    ByRules(&'static [Route]),
    /// Run a fixed action sequence; a failed step ends it early
    ByOrder(&'static [ActionKind]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    Idle,
    Ready(ActionKind),
    Failed,
}

/// State shared by every agent: identity, subscriptions, policy and memory.
#[derive(Debug, Clone)]
pub struct AgentCore {
    pub role: Role,
    pub profile: &'static str,
    /// Action kinds whose broadcasts this agent receives
    pub watch: &'static [ActionKind],
    pub mode: ReactMode,
    pub memory: Memory,
    pub state: AgentState,
    repairs: usize,
}

impl AgentCore {
    pub fn new(
        role: Role,
        profile: &'static str,
        watch: &'static [ActionKind],
        mode: ReactMode,
    ) -> Self {
        Self {
            role,
            profile,
            watch,
            mode,
            memory: Memory::new(),
            state: AgentState::Idle,
            repairs: 0,
        }
    }

    pub fn receives(&self, message: &Message) -> bool {
        message.is_for(self.role, self.watch)
    }

    /// Clear per-run state.
    pub fn reset(&mut self) {
        self.memory = Memory::new();
        self.state = AgentState::Idle;
        self.repairs = 0;
    }

    /// Route lookup without side effects.
    pub fn route_for(&self, message: &Message) -> Option<ActionKind> {
        match self.mode {
            ReactMode::ByRules(routes) => routes.iter().find(|r| r.matches(message)).map(|r| r.run),
            ReactMode::ByOrder(steps) => steps.first().copied(),
        }
    }

    /// Choose the next action from the most recent message.
    pub fn think(&mut self) -> Result<ActionKind, ForgeError> {
        let message = self.memory.last().ok_or_else(|| {
            ForgeError::Internal(anyhow::anyhow!("{} has no message to react to", self.role))
        })?;

        match self.route_for(message) {
            Some(action) => {
                debug!(role = %self.role, on = %message.produced_by, action = %action, "routed");
                self.state = AgentState::Ready(action);
                Ok(action)
            }
            None => {
                let err = ForgeError::Routing {
                    role: self.role,
                    produced_by: message.produced_by,
                    sender: message.sender,
                };
                self.state = AgentState::Failed;
                Err(err)
            }
        }
    }

    fn count_repair(&mut self, action: ActionKind, limit: Option<usize>) -> Result<(), ForgeError> {
        if !action.is_fix() {
            return Ok(());
        }
        if let Some(limit) = limit {
            if self.repairs >= limit {
                self.state = AgentState::Failed;
                return Err(ForgeError::RepairLimit {
                    role: self.role,
                    limit,
                });
            }
        }
        self.repairs += 1;
        Ok(())
    }

    /// Build an outgoing message from this agent.
    pub fn message(&self, content: impl Into<String>, produced_by: ActionKind) -> Message {
        Message::new(content, produced_by, self.role)
    }
}

/// A participant in the team
///
/// Implementors own their actions and say how to perform each one;
/// [`Agent::react`] supplies the think/act cycle for both react modes.
#[async_trait]
pub trait Agent: Send + Sync {
    fn core(&self) -> &AgentCore;

    fn core_mut(&mut self) -> &mut AgentCore;

    /// Run `action` and turn its result into exactly one message.
    async fn perform(&mut self, action: ActionKind, ctx: &ActionContext) -> anyhow::Result<Message>;

    fn role(&self) -> Role {
        self.core().role
    }

    /// Run one action with repair accounting and typed errors.
    async fn act(&mut self, action: ActionKind, ctx: &ActionContext) -> Result<Message, ForgeError> {
        self.core_mut().count_repair(action, ctx.max_repairs())?;
        info!(role = %self.role(), action = %action, "acting");

        match self.perform(action, ctx).await {
            Ok(message) => {
                self.core_mut().state = AgentState::Idle;
                Ok(message)
            }
            Err(e) => {
                self.core_mut().state = AgentState::Failed;
                Err(ForgeError::from_action(action, e))
            }
        }
    }

    /// Think then act on the messages received since the last turn.
    async fn react(&mut self, ctx: &ActionContext) -> Result<Message, ForgeError> {
        let mode = self.core().mode;
        match mode {
            ReactMode::ByRules(_) => {
                let action = self.core_mut().think()?;
                self.act(action, ctx).await
            }
            ReactMode::ByOrder(steps) => {
                let mut outgoing = None;
                for &action in steps {
                    self.core_mut().state = AgentState::Ready(action);
                    let message = self.act(action, ctx).await?;
                    let stop = message.is_failed();
                    self.core_mut().memory.push(message.clone());
                    outgoing = Some(message);
                    if stop {
                        break;
                    }
                }
                outgoing.ok_or_else(|| {
                    ForgeError::Internal(anyhow::anyhow!(
                        "{} has an empty action sequence",
                        self.role()
                    ))
                })
            }
        }
    }
}

/// Content of the most recent message, for actions that take it as input.
pub(crate) fn last_content(core: &AgentCore) -> anyhow::Result<String> {
    core.memory
        .last()
        .map(|m| m.content.clone())
        .with_context(|| format!("{} has no message to work from", core.role))
}

/// Content of the latest message produced by `kind`.
pub(crate) fn latest_content(core: &AgentCore, kind: ActionKind) -> anyhow::Result<String> {
    core.memory
        .latest_by(kind)
        .map(|m| m.content.clone())
        .with_context(|| format!("{} has not received any {} output", core.role, kind))
}
