pub mod actions;
pub mod agents;
pub mod builder;
pub mod config;
pub mod error;
pub mod event;
mod forge;
pub mod llm;
pub mod pipeline;
pub mod record;
pub mod run_handle;
pub mod runtime;
pub mod tools;

pub use actions::{Action, ActionContext, ActionKind};
pub use agents::{Agent, AgentCore, Destination, Message, MessageStatus, ReactMode, Role, Route};
pub use builder::ForgeBuilder;
pub use config::{AlgorithmInputs, BuildWorkspace, ForgeConfig};
pub use error::ForgeError;
pub use event::{Event, EventSender, RunStatus};
pub use forge::Forge;
pub use llm::{AnthropicProvider, LlmProvider, OpenAIProvider, RetryConfig};
pub use pipeline::PipelineKind;
pub use record::{RecordStatus, RunRecord, RunStore, RunSummary, SqliteRunStore};
pub use run_handle::{RunHandle, RunOutput};
pub use runtime::{CallRecorder, RunReport, Team, Termination};
pub use tools::{
    Compiler, ExecutableRunner, FileStore, HlsProject, HlsTool, LocalFileStore, ToolOutcome,
    Toolchain,
};
