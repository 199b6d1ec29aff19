use anyhow::Result;
use async_trait::async_trait;

use super::parse::parse_code;
use super::prompts::{self, render};
use super::{Action, ActionContext, ActionKind};

/// Generate the algorithm implementation from the description.
pub struct WriteAlgorithmCode;

#[async_trait]
impl Action for WriteAlgorithmCode {
    const KIND: ActionKind = ActionKind::WriteAlgorithmCode;
    type Input = String;
    type Output = String;

    async fn run(&self, ctx: &ActionContext, description: String) -> Result<String> {
        let header = ctx.read_optional(ctx.inputs.header.as_deref()).await?;
        let include_line = match ctx.inputs.header_name() {
            Some(name) => format!("Include the header with `#include \"{}\"`.", name),
            None => "Declare any types and constants the implementation needs.".to_string(),
        };

        let prompt = render(
            prompts::WRITE_ALGORITHM_CODE,
            &[
                ("description", &description),
                ("header", &header),
                ("include_line", &include_line),
            ],
        );
        let code = parse_code(&ctx.ask(&prompt).await?);
        ctx.write(&ctx.workspace.impl_file(), &code).await?;
        Ok(code)
    }
}

/// Repair the implementation from compiler diagnostics.
pub struct FixCompileError;

#[async_trait]
impl Action for FixCompileError {
    const KIND: ActionKind = ActionKind::FixCompileError;
    type Input = String;
    type Output = String;

    async fn run(&self, ctx: &ActionContext, diagnostics: String) -> Result<String> {
        let path = ctx.workspace.impl_file();
        let code = ctx.read(&path).await?;

        let prompt = render(
            prompts::FIX_COMPILE_ERROR,
            &[("code", &code), ("diagnostics", &diagnostics)],
        );
        let fixed = parse_code(&ctx.ask(&prompt).await?);
        ctx.write(&path, &fixed).await?;
        Ok(fixed)
    }
}

/// Repair the implementation from failing test output.
pub struct FixCCode;

#[async_trait]
impl Action for FixCCode {
    const KIND: ActionKind = ActionKind::FixCCode;
    type Input = String;
    type Output = String;

    async fn run(&self, ctx: &ActionContext, error: String) -> Result<String> {
        let path = ctx.workspace.impl_file();
        let code = ctx.read(&path).await?;
        let harness = ctx.read(&ctx.workspace.test_file()).await?;

        let prompt = render(
            prompts::FIX_C_CODE,
            &[
                ("code", &code),
                ("error", &error),
                ("harness", &harness),
                ("description", &ctx.inputs.description),
            ],
        );
        let fixed = parse_code(&ctx.ask(&prompt).await?);
        ctx.write(&path, &fixed).await?;
        Ok(fixed)
    }
}

/// Work out reference input/output vectors for the algorithm.
pub struct DesignIoReference {
    pub cases: usize,
}

impl Default for DesignIoReference {
    fn default() -> Self {
        Self { cases: 4 }
    }
}

#[async_trait]
impl Action for DesignIoReference {
    const KIND: ActionKind = ActionKind::DesignIoReference;
    type Input = String;
    type Output = String;

    async fn run(&self, ctx: &ActionContext, description: String) -> Result<String> {
        let cases = self.cases.to_string();
        let prompt = render(
            prompts::DESIGN_IO_REFERENCE,
            &[("description", &description), ("cases", &cases)],
        );
        let reference = ctx.ask(&prompt).await?.trim().to_string();
        ctx.write(&ctx.workspace.reference_file(), &reference).await?;
        Ok(reference)
    }
}

pub struct TestCaseRequest {
    pub description: String,
    pub reference: String,
}

/// Turn reference vectors into a C++ `main` that asserts on them.
pub struct WriteTestCase;

#[async_trait]
impl Action for WriteTestCase {
    const KIND: ActionKind = ActionKind::WriteTestCase;
    type Input = TestCaseRequest;
    type Output = String;

    async fn run(&self, ctx: &ActionContext, request: TestCaseRequest) -> Result<String> {
        let header = ctx.read_optional(ctx.inputs.header.as_deref()).await?;
        let prompt = render(
            prompts::WRITE_TEST_CASE,
            &[
                ("description", &request.description),
                ("header", &header),
                ("reference", &request.reference),
            ],
        );
        Ok(parse_code(&ctx.ask(&prompt).await?))
    }
}
