use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use super::parse::{extract_func_name, function_prototype, parse_code};
use super::prompts::{self, render};
use super::{Action, ActionContext, ActionKind};
use crate::config::BuildWorkspace;
use crate::tools::{HlsProject, ToolOutcome, absolute};

/// Rewrite the verified implementation into synthesizable HLS source.
pub struct RepairHlsCode;

#[async_trait]
impl Action for RepairHlsCode {
    const KIND: ActionKind = ActionKind::RepairHlsCode;
    type Input = ();
    type Output = String;

    async fn run(&self, ctx: &ActionContext, _: ()) -> Result<String> {
        let code = ctx.read(&ctx.workspace.impl_file()).await?;
        let prompt = render(prompts::REPAIR_HLS_CODE, &[("code", &code)]);
        let repaired = parse_code(&ctx.ask(&prompt).await?);
        ctx.write(&ctx.workspace.hls_src(), &repaired).await?;
        Ok(repaired)
    }
}

/// Shared body of the two log-driven HLS repairs.
async fn fix_from_log(ctx: &ActionContext, template: &str, path: &Path, log: &str) -> Result<String> {
    let code = ctx.read(path).await?;
    let prompt = render(template, &[("code", &code), ("log", log)]);
    let fixed = parse_code(&ctx.ask(&prompt).await?);
    ctx.write(path, &fixed).await?;
    Ok(fixed)
}

/// Repair HLS source from a synthesis or cosimulation log.
pub struct FixHlsCode;

#[async_trait]
impl Action for FixHlsCode {
    const KIND: ActionKind = ActionKind::FixHlsCode;
    type Input = String;
    type Output = String;

    async fn run(&self, ctx: &ActionContext, log: String) -> Result<String> {
        fix_from_log(ctx, prompts::FIX_HLS_CODE, &ctx.workspace.hls_src(), &log).await
    }
}

/// Repair optimized HLS source from a synthesis log.
pub struct FixHlsOpt;

#[async_trait]
impl Action for FixHlsOpt {
    const KIND: ActionKind = ActionKind::FixHlsOpt;
    type Input = String;
    type Output = String;

    async fn run(&self, ctx: &ActionContext, log: String) -> Result<String> {
        fix_from_log(ctx, prompts::FIX_HLS_OPT, &ctx.workspace.hls_opt(), &log).await
    }
}

/// Top function: configured, or the last function defined in `source`.
async fn top_function(ctx: &ActionContext, source: &Path) -> Result<String> {
    if let Some(top) = &ctx.inputs.top_function {
        return Ok(top.clone());
    }
    let code = ctx.read(source).await?;
    extract_func_name(&code).with_context(|| {
        format!(
            "no function definition found in {}; pass the top function explicitly",
            source.display()
        )
    })
}

/// Testbench for a cosimulation of `source`.
///
/// The user's testbench, staged next to the HLS source, wins. Otherwise the
/// designed test case is wrapped so it calls the top function of the HLS
/// source rather than the software implementation.
async fn cosim_testbench(ctx: &ActionContext, top: &str, source: &Path) -> Result<PathBuf> {
    if let Some(tb) = &ctx.inputs.testbench {
        return Ok(absolute(&BuildWorkspace::staged(&ctx.workspace.hls_dir(), tb)));
    }

    let test_case = ctx
        .read(&ctx.workspace.test_case_file())
        .await
        .context("no testbench given and no test case designed")?;
    let header = ctx.inputs.header_name();
    let prototype = match header {
        Some(_) => None,
        None => {
            let code = ctx.read(source).await?;
            let prototype = function_prototype(&code, top);
            if prototype.is_none() {
                warn!(top, source = %source.display(), "no definition of the top function to declare");
            }
            prototype
        }
    };

    let tb = ctx.workspace.hls_tb();
    let text = CosimulateHls::testbench(header.as_deref(), prototype.as_deref(), &test_case);
    ctx.write(&tb, &text).await?;
    Ok(absolute(&tb))
}

/// Synthesis project; testbenches only matter to cosimulation.
async fn synth_project(ctx: &ActionContext, dir: PathBuf, source: PathBuf) -> Result<HlsProject> {
    Ok(HlsProject {
        top: top_function(ctx, &source).await?,
        dir,
        sources: vec![absolute(&source)],
        testbenches: Vec::new(),
    })
}

/// Synthesize the baseline HLS source.
pub struct SynthesizeHls;

#[async_trait]
impl Action for SynthesizeHls {
    const KIND: ActionKind = ActionKind::SynthesizeHls;
    type Input = ();
    type Output = ToolOutcome;

    async fn run(&self, ctx: &ActionContext, _: ()) -> Result<ToolOutcome> {
        let project = synth_project(ctx, ctx.workspace.hls_project(), ctx.workspace.hls_src()).await?;
        ctx.toolchain.hls.synthesize(&project).await
    }
}

/// Cosimulate the synthesized baseline against the testbench.
pub struct CosimulateHls;

impl CosimulateHls {
    /// Generated testbench text: the header or the top function's prototype,
    /// then the test case.
    pub fn testbench(header_name: Option<&str>, prototype: Option<&str>, test_case: &str) -> String {
        let preamble = match (header_name, prototype) {
            (Some(header), _) => format!("#include \"{}\"\n\n", header),
            (None, Some(prototype)) => format!("{}\n\n", prototype),
            (None, None) => String::new(),
        };
        format!("{}{}\n", preamble, test_case.trim())
    }
}

#[async_trait]
impl Action for CosimulateHls {
    const KIND: ActionKind = ActionKind::CosimulateHls;
    type Input = ();
    type Output = ToolOutcome;

    async fn run(&self, ctx: &ActionContext, _: ()) -> Result<ToolOutcome> {
        let source = ctx.workspace.hls_src();
        let top = top_function(ctx, &source).await?;
        let tb = cosim_testbench(ctx, &top, &source).await?;
        let project = HlsProject {
            top,
            dir: ctx.workspace.hls_project(),
            sources: vec![absolute(&source)],
            testbenches: vec![tb],
        };
        ctx.toolchain.hls.cosimulate(&project).await
    }
}

/// Synthesize the pragma-annotated source in its own project.
pub struct SynthesizeOptimized;

#[async_trait]
impl Action for SynthesizeOptimized {
    const KIND: ActionKind = ActionKind::SynthesizeOptimized;
    type Input = ();
    type Output = ToolOutcome;

    async fn run(&self, ctx: &ActionContext, _: ()) -> Result<ToolOutcome> {
        let project =
            synth_project(ctx, ctx.workspace.hls_opt_project(), ctx.workspace.hls_opt()).await?;
        ctx.toolchain.hls.synthesize(&project).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_testbench_declares_the_top_function() {
        let tb = CosimulateHls::testbench(
            None,
            Some("int add(int a, int b);"),
            "int main() { return add(2, 3) == 5 ? 0 : 1; }\n",
        );
        assert_eq!(
            tb,
            "int add(int a, int b);\n\nint main() { return add(2, 3) == 5 ? 0 : 1; }\n"
        );
        assert!(!tb.contains("impl.cpp"));
    }

    #[test]
    fn generated_testbench_prefers_the_header() {
        let tb = CosimulateHls::testbench(Some("fir.h"), None, "int main() { return 0; }");
        assert!(tb.starts_with("#include \"fir.h\"\n\n"));
    }
}
