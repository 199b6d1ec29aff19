use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use nl2hls::{
    AlgorithmInputs, Destination, Event, Forge, ForgeConfig, PipelineKind, RecordStatus, RunStore,
    SqliteRunStore,
};

#[derive(Parser)]
#[command(name = "nl2hls", version)]
#[command(
    about = "Turns algorithm descriptions into verified, synthesizable HLS C++",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// LLM provider to use (anthropic, openai)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model to use (provider-specific)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent team on an algorithm description
    Run {
        /// File containing the natural-language algorithm description
        algo_file: PathBuf,

        /// Cost ceiling for model calls, in dollars
        #[arg(long)]
        investment: Option<f64>,

        /// Round budget
        #[arg(long)]
        n_round: Option<usize>,

        /// Agent roster: full, software or optimize
        #[arg(long, default_value = "full")]
        pipeline: PipelineKind,

        /// Header declaring the algorithm interface
        #[arg(long)]
        header: Option<PathBuf>,

        /// Testbench used for cosimulation
        #[arg(long)]
        testbench: Option<PathBuf>,

        /// Existing HLS source (required by the optimize pipeline)
        #[arg(long)]
        hls_source: Option<PathBuf>,

        /// Top function name for synthesis
        #[arg(long)]
        top: Option<String>,

        /// Directory for generated sources and tool projects
        #[arg(long)]
        build_dir: Option<PathBuf>,

        /// Evaluate the agents of a round one at a time
        #[arg(long)]
        sequential: bool,

        /// Restructure loops (merging, interchange, tiling) before choosing pragmas
        #[arg(long)]
        loop_review: bool,

        /// Save the run record for later inspection
        #[arg(long)]
        save_run: bool,
    },

    /// List saved runs
    Runs {
        /// Show only runs with this status (running, passed, exhausted, failed)
        #[arg(long)]
        status: Option<String>,
    },

    /// Print a saved run's message transcript
    Show {
        /// Run ID or unique prefix
        run_id: String,
    },

    /// Export a saved run to a JSON file
    ExportRun {
        /// Run ID or unique prefix
        run_id: String,

        /// Output file path (defaults to <run-id>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a saved run
    DeleteRun {
        /// Full run ID
        run_id: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("info".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve which provider name to use.
/// CLI argument takes highest precedence, then config file, then default.
fn resolve_provider<'a>(
    cli_provider: Option<&'a str>,
    config_provider: Option<&'a str>,
) -> &'a str {
    cli_provider.or(config_provider).unwrap_or("anthropic")
}

fn describe(event: &Event) -> Option<String> {
    match event {
        Event::RunStarted {
            run_id, pipeline, ..
        } => Some(format!("run {} ({} pipeline)", run_id, pipeline)),
        Event::MessagePosted {
            round,
            sender,
            produced_by,
            status,
            destination,
        } => {
            let target = match destination {
                Destination::Broadcast => "all".to_string(),
                Destination::To(role) => role.to_string(),
            };
            Some(format!(
                "[round {:>2}] {} -> {}: {} ({:?})",
                round, sender, target, produced_by, status
            ))
        }
        Event::Quiescent { round } => Some(format!("quiescent after round {}", round)),
        Event::Warning { message } => Some(format!("warning: {}", message)),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ForgeConfig::load().unwrap_or_else(|e| {
        debug!(error = %e, "failed to load config, using defaults");
        ForgeConfig::default()
    });

    match cli.command {
        Commands::Run {
            algo_file,
            investment,
            n_round,
            pipeline,
            header,
            testbench,
            hls_source,
            top,
            build_dir,
            sequential,
            loop_review,
            save_run,
        } => {
            let provider_name =
                resolve_provider(cli.provider.as_deref(), config.provider.as_deref());
            let model_name = cli.model.as_deref().or(config.model.as_deref());

            let mut builder = Forge::builder()
                .provider_by_name(provider_name, model_name)
                .context("failed to create LLM provider")?
                .config(config.clone())
                .pipeline(pipeline);

            if let Some(investment) = investment {
                builder = builder.investment(investment);
            }
            if let Some(n_round) = n_round {
                builder = builder.n_round(n_round);
            }
            if let Some(dir) = build_dir {
                builder = builder.build_dir(dir);
            }
            if sequential {
                builder = builder.concurrent(false);
            }
            if loop_review {
                builder = builder.loop_review(true);
            }
            if save_run {
                builder = builder
                    .sqlite_store()
                    .context("failed to initialize run store")?;
            }
            let forge = builder.build().context("failed to build the agent team")?;

            let mut inputs = AlgorithmInputs::from_file(&algo_file).await?;
            if let Some(header) = header {
                inputs = inputs.with_header(header);
            }
            if let Some(testbench) = testbench {
                inputs = inputs.with_testbench(testbench);
            }
            if let Some(source) = hls_source {
                inputs = inputs.with_hls_source(source);
            }
            if let Some(top) = top {
                inputs = inputs.with_top_function(top);
            }
            let inputs = inputs.discover()?;

            info!(provider = %provider_name, pipeline = %pipeline, save_run, "starting run");

            let mut handle = match forge.run(inputs).await {
                Ok(handle) => handle,
                Err(e) => {
                    error!(error = %e, "run failed to start");
                    anyhow::bail!("run failed: {}", e);
                }
            };
            while let Some(event) = handle.next_event().await {
                if let Some(line) = describe(&event) {
                    println!("{}", line);
                }
            }
            let output = handle.wait().await.context("run aborted")?;
            let report = output.report;

            println!();
            println!("run:         {}", output.run_id);
            println!("termination: {:?}", report.termination);
            println!("rounds:      {}", report.rounds);
            for (kind, count) in &report.call_counts {
                println!("  {:<22} {}", kind, count);
            }

            if !report.passed {
                anyhow::bail!("run ended without a pass after {} rounds", report.rounds);
            }
            println!("passed");
        }

        Commands::Runs { status } => {
            let store =
                SqliteRunStore::default_location().context("failed to initialize run store")?;

            let status_filter = status
                .map(|s| {
                    s.parse::<RecordStatus>()
                        .with_context(|| format!("invalid status filter: {}", s))
                })
                .transpose()?;

            let runs = store.list(status_filter).await?;
            if runs.is_empty() {
                println!("No runs found.");
                return Ok(());
            }

            println!(
                "{:<10} {:<10} {:<9} {:>3} REQUIREMENT",
                "ID", "STATUS", "PIPELINE", "RND"
            );
            println!("{}", "-".repeat(70));
            for run in runs {
                println!("{}", run);
            }
        }

        Commands::Show { run_id } => {
            let store =
                SqliteRunStore::default_location().context("failed to initialize run store")?;
            let record = store
                .load(&run_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("run not found: {}", run_id))?;

            println!("run:       {}", record.id);
            println!("pipeline:  {}", record.pipeline);
            println!("status:    {}", record.status);
            println!("rounds:    {}", record.rounds);
            println!("spent:     ${:.4}", record.spent);
            println!("build dir: {}", record.build_dir);
            if let Some(error) = &record.error {
                println!("error:     {}", error);
            }
            println!();
            println!("{}", record.transcript());
        }

        Commands::ExportRun { run_id, output } => {
            let store =
                SqliteRunStore::default_location().context("failed to initialize run store")?;
            let record = store
                .load(&run_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("run not found: {}", run_id))?;

            info!(run_id = %record.id, "exporting run");
            let output_path = output.unwrap_or_else(|| PathBuf::from(format!("{}.json", record.id)));
            let json = serde_json::to_string_pretty(&record).context("failed to serialize run")?;

            std::fs::write(&output_path, json)
                .with_context(|| format!("failed to write to {}", output_path.display()))?;

            println!("Exported run {} to {}", record.id, output_path.display());
        }

        Commands::DeleteRun { run_id } => {
            let store =
                SqliteRunStore::default_location().context("failed to initialize run store")?;

            store.delete(&run_id).await?;
            println!("Deleted run: {}", run_id);
        }
    }

    Ok(())
}
