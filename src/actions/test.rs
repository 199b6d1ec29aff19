use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use super::{Action, ActionContext, ActionKind};
use crate::tools::ToolOutcome;

/// Assemble the test harness from a test case. No model call.
///
/// With a header the harness includes it and is compiled alongside the
/// implementation; without one it includes the implementation directly.
pub struct WriteTestCode;

impl WriteTestCode {
    pub fn harness(header_name: Option<&str>, test_case: &str) -> String {
        let include = header_name.unwrap_or("impl.cpp");
        format!("#include \"{}\"\n\n{}\n", include, test_case.trim())
    }
}

#[async_trait]
impl Action for WriteTestCode {
    const KIND: ActionKind = ActionKind::WriteTestCode;
    type Input = String;
    type Output = String;

    async fn run(&self, ctx: &ActionContext, test_case: String) -> Result<String> {
        let harness = Self::harness(ctx.inputs.header_name().as_deref(), &test_case);
        // Reused by the generated cosimulation testbench.
        ctx.write(&ctx.workspace.test_case_file(), test_case.trim())
            .await?;
        ctx.write(&ctx.workspace.test_file(), &harness).await?;
        Ok(harness)
    }
}

/// Sources that make up the test executable.
fn test_sources(ctx: &ActionContext) -> Vec<PathBuf> {
    if ctx.inputs.header.is_some() {
        vec![ctx.workspace.impl_file(), ctx.workspace.test_file()]
    } else {
        vec![ctx.workspace.test_file()]
    }
}

/// Compile the implementation and harness.
pub struct CompileCode;

#[async_trait]
impl Action for CompileCode {
    const KIND: ActionKind = ActionKind::CompileCode;
    type Input = ();
    type Output = ToolOutcome;

    async fn run(&self, ctx: &ActionContext, _: ()) -> Result<ToolOutcome> {
        ctx.toolchain
            .compiler
            .compile(&test_sources(ctx), &ctx.workspace.test_exe())
            .await
    }
}

/// Run the compiled harness. Exit code 0 is a pass.
pub struct RunCode;

#[async_trait]
impl Action for RunCode {
    const KIND: ActionKind = ActionKind::RunCode;
    type Input = ();
    type Output = ToolOutcome;

    async fn run(&self, ctx: &ActionContext, _: ()) -> Result<ToolOutcome> {
        ctx.toolchain
            .runner
            .run(
                &ctx.workspace.test_exe(),
                &ctx.workspace.impl_dir(),
                ctx.toolchain.run_timeout,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_prefers_header_include() {
        let harness = WriteTestCode::harness(Some("fir.h"), "int main() { return 0; }\n");
        assert_eq!(harness, "#include \"fir.h\"\n\nint main() { return 0; }\n");
    }

    #[test]
    fn harness_without_header_pulls_in_implementation() {
        let harness = WriteTestCode::harness(None, "int main() {}");
        assert!(harness.starts_with("#include \"impl.cpp\""));
    }
}
