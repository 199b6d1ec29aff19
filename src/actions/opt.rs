use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::parse::{parse_code, parse_opt_list};
use super::prompts::{self, loop_strategy_catalog, pragma, pragma_catalog, render};
use super::{Action, ActionContext, ActionKind};

/// Canonicalize existing HLS source before optimization.
///
/// Reads the user-supplied HLS source when there is one, and always writes
/// the result to the workspace's HLS source path.
pub struct PreprocessHlsCode;

#[async_trait]
impl Action for PreprocessHlsCode {
    const KIND: ActionKind = ActionKind::PreprocessHlsCode;
    type Input = ();
    type Output = String;

    async fn run(&self, ctx: &ActionContext, _: ()) -> Result<String> {
        let source = ctx
            .inputs
            .hls_source
            .clone()
            .unwrap_or_else(|| ctx.workspace.hls_src());
        let code = ctx.read(&source).await?;

        let prompt = render(prompts::PREPROCESS_HLS_CODE, &[("code", &code)]);
        let normalized = parse_code(&ctx.ask(&prompt).await?);
        ctx.write(&ctx.workspace.hls_src(), &normalized).await?;
        Ok(normalized)
    }
}

/// Restructure loops (merging, interchange, tiling) before pragmas are chosen.
///
/// Returns the new source when the model changed it; the previous version
/// is kept as the baseline. Unchanged source is not rewritten.
pub struct ApplyLoopStrategy;

#[async_trait]
impl Action for ApplyLoopStrategy {
    const KIND: ActionKind = ActionKind::ApplyLoopStrategy;
    type Input = ();
    type Output = Option<String>;

    async fn run(&self, ctx: &ActionContext, _: ()) -> Result<Option<String>> {
        let source = ctx.workspace.hls_src();
        let code = ctx.read(&source).await?;
        let strategies = loop_strategy_catalog();
        let prompt = render(
            prompts::APPLY_LOOP_STRATEGY,
            &[
                ("description", &ctx.inputs.description),
                ("code", &code),
                ("strategies", &strategies),
            ],
        );

        let restructured = parse_code(&ctx.ask(&prompt).await?);
        if restructured.trim() == code.trim() {
            debug!("loop structure left as is");
            return Ok(None);
        }
        ctx.write(&ctx.workspace.hls_baseline(), &code).await?;
        ctx.write(&source, &restructured).await?;
        Ok(Some(restructured))
    }
}

/// Ask which pragmas suit the current HLS source.
pub struct ChooseOptimizations;

#[async_trait]
impl Action for ChooseOptimizations {
    const KIND: ActionKind = ActionKind::ChooseOptimizations;
    type Input = ();
    type Output = Vec<String>;

    async fn run(&self, ctx: &ActionContext, _: ()) -> Result<Vec<String>> {
        let code = ctx.read(&ctx.workspace.hls_src()).await?;
        let catalog = pragma_catalog();
        let prompt = render(
            prompts::CHOOSE_OPTIMIZATIONS,
            &[("catalog", &catalog), ("code", &code)],
        );

        let mut chosen = parse_opt_list(&ctx.ask(&prompt).await?);
        chosen.retain(|opt| {
            let known = pragma(opt).is_some();
            if !known {
                warn!(option = %opt, "ignoring unknown optimization");
            }
            known
        });
        Ok(chosen)
    }
}

/// Insert the chosen pragmas, writing the optimized source.
pub struct ApplyOptimizations;

impl ApplyOptimizations {
    fn describe(opts: &[String]) -> String {
        opts.iter()
            .filter_map(|opt| pragma(opt))
            .enumerate()
            .map(|(i, p)| format!("{}. {} ({})\n{}", i + 1, p.name, p.when, p.example))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl Action for ApplyOptimizations {
    const KIND: ActionKind = ActionKind::ApplyOptimizations;
    type Input = Vec<String>;
    type Output = String;

    async fn run(&self, ctx: &ActionContext, opts: Vec<String>) -> Result<String> {
        let code = ctx.read(&ctx.workspace.hls_src()).await?;
        let header = ctx.read_optional(ctx.inputs.header.as_deref()).await?;
        let pragmas = Self::describe(&opts);

        let prompt = render(
            prompts::APPLY_OPTIMIZATIONS,
            &[("code", &code), ("header", &header), ("pragmas", &pragmas)],
        );
        let optimized = parse_code(&ctx.ask(&prompt).await?);
        ctx.write(&ctx.workspace.hls_opt(), &optimized).await?;
        Ok(optimized)
    }
}
