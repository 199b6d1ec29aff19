mod project;
mod workspace;

pub use project::{ForgeConfig, Pricing, ToolchainConfig, WorkspaceConfig};
pub use workspace::{AlgorithmInputs, BuildWorkspace};
