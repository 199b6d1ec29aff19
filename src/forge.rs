use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::actions::ActionContext;
use crate::builder::ForgeBuilder;
use crate::config::{AlgorithmInputs, BuildWorkspace, ForgeConfig};
use crate::error::ForgeError;
use crate::event::{Event, EventSender, RunStatus};
use crate::llm::{BudgetedProvider, CostLedger, LlmProvider, RetryConfig};
use crate::pipeline::PipelineKind;
use crate::record::{RecordStatus, RunRecord, RunStore, RunSummary};
use crate::run_handle::{RunHandle, RunOutput};
use crate::tools::{FileStore, Toolchain, absolute};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shared inner state, wrapped in Arc so spawned tasks can reference it.
struct Inner {
    provider: Arc<dyn LlmProvider>,
    toolchain: Toolchain,
    files: Arc<dyn FileStore>,
    store: Option<Box<dyn RunStore>>,
    config: ForgeConfig,
    pipeline: PipelineKind,
    retry: RetryConfig,
}

/// Primary entry point for the nl2hls library.
///
/// Use [`Forge::builder()`] to construct an instance.
///
/// # Example
///
/// ```no_run
/// # use nl2hls::{AlgorithmInputs, Forge};
/// # async fn example() -> Result<(), nl2hls::ForgeError> {
/// let forge = Forge::builder().anthropic(None)?.build()?;
///
/// let inputs = AlgorithmInputs::from_file("fir.txt").await?;
/// let mut handle = forge.run(inputs).await?;
/// while let Some(event) = handle.next_event().await {
///     println!("{:?}", event);
/// }
/// let output = handle.wait().await?;
/// println!("{:?} after {} rounds", output.report.termination, output.report.rounds);
/// # Ok(())
/// # }
/// ```
pub struct Forge {
    inner: Arc<Inner>,
}

impl Forge {
    pub(crate) fn from_parts(
        provider: Arc<dyn LlmProvider>,
        toolchain: Toolchain,
        files: Arc<dyn FileStore>,
        store: Option<Box<dyn RunStore>>,
        config: ForgeConfig,
        pipeline: PipelineKind,
        retry: RetryConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                toolchain,
                files,
                store,
                config,
                pipeline,
                retry,
            }),
        }
    }

    /// Create a new builder for configuring a `Forge` instance.
    pub fn builder() -> ForgeBuilder {
        ForgeBuilder::new()
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> PipelineKind {
        self.inner.pipeline
    }

    /// Start a run and return a handle for events and the final report.
    ///
    /// The team runs in a background tokio task. Use the returned
    /// [`RunHandle`] to receive events and await completion.
    pub async fn run(&self, inputs: AlgorithmInputs) -> Result<RunHandle, ForgeError> {
        let pipeline = self.inner.pipeline;
        if pipeline.needs_hls_source() && inputs.hls_source.is_none() {
            return Err(ForgeError::Config(format!(
                "the {} pipeline needs existing HLS source",
                pipeline
            )));
        }
        if pipeline.needs_testbench() && inputs.testbench.is_none() {
            return Err(ForgeError::Config(format!(
                "the {} pipeline needs a cosimulation testbench",
                pipeline
            )));
        }
        if inputs.description.trim().is_empty() {
            return Err(ForgeError::Config(
                "algorithm description is empty".to_string(),
            ));
        }

        info!(
            pipeline = %pipeline,
            n_round = self.inner.config.n_round,
            investment = self.inner.config.investment,
            "starting run"
        );

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let events = EventSender::new(tx);
        let inner = Arc::clone(&self.inner);

        let completion = tokio::spawn(async move {
            let result = execute_run(&inner, inputs, &events).await;
            let status = match &result {
                Ok(out) if out.report.passed => RunStatus::Passed,
                Ok(_) => RunStatus::Exhausted,
                Err(e) => RunStatus::Failed {
                    error: e.to_string(),
                },
            };
            events.emit_blocking(Event::RunCompleted { status }).await;
            // EventSender is dropped here, closing the channel
            result
        });

        Ok(RunHandle::new(rx, completion))
    }

    /// List saved runs, optionally only those with `status`.
    pub async fn runs(&self, status: Option<RecordStatus>) -> Result<Vec<RunSummary>, ForgeError> {
        self.require_store()?
            .list(status)
            .await
            .map_err(|e| ForgeError::Storage(format!("failed to list runs: {:#}", e)))
    }

    /// Load a saved run by ID or unique ID prefix.
    pub async fn load_run(&self, id: &str) -> Result<RunRecord, ForgeError> {
        self.require_store()?
            .load(id)
            .await
            .map_err(|e| ForgeError::Storage(format!("failed to load run: {:#}", e)))?
            .ok_or_else(|| ForgeError::Storage(format!("run not found: {}", id)))
    }

    pub async fn delete_run(&self, id: &str) -> Result<(), ForgeError> {
        self.require_store()?
            .delete(id)
            .await
            .map_err(|e| ForgeError::Storage(format!("failed to delete run: {:#}", e)))
    }

    /// A saved run as pretty-printed JSON.
    pub async fn export_run(&self, id: &str) -> Result<String, ForgeError> {
        let record = self.load_run(id).await?;
        info!(run_id = %record.id, "exporting run");
        serde_json::to_string_pretty(&record)
            .map_err(|e| ForgeError::Internal(anyhow::Error::new(e).context("failed to serialize run")))
    }

    fn require_store(&self) -> Result<&dyn RunStore, ForgeError> {
        self.inner
            .store
            .as_deref()
            .ok_or_else(|| ForgeError::Storage("no run store configured".to_string()))
    }
}

async fn save(store: Option<&dyn RunStore>, record: &RunRecord) -> Result<(), ForgeError> {
    if let Some(store) = store {
        store
            .save(record)
            .await
            .map_err(|e| ForgeError::Storage(format!("failed to save run: {:#}", e)))?;
    }
    Ok(())
}

async fn execute_run(
    inner: &Inner,
    inputs: AlgorithmInputs,
    events: &EventSender,
) -> Result<RunOutput, ForgeError> {
    let config = &inner.config;
    let store = inner.store.as_deref();

    let workspace = BuildWorkspace::new(absolute(&config.workspace.build_dir));
    workspace.prepare().await?;
    workspace.stage_inputs(&inputs).await?;

    let mut record = RunRecord::new(
        inputs.description.clone(),
        inner.pipeline.name(),
        workspace.root().display().to_string(),
    );
    save(store, &record).await?;
    info!(run_id = %record.id, build_dir = %record.build_dir, "created run");

    let ledger = Arc::new(CostLedger::new(config.investment, config.pricing));
    let llm = Arc::new(BudgetedProvider::new(
        Arc::clone(&inner.provider),
        Arc::clone(&ledger),
    ));
    let description = inputs.description.clone();
    let ctx = ActionContext::new(
        llm,
        inner.toolchain.clone(),
        Arc::clone(&inner.files),
        workspace,
        inputs,
    )
    .with_llm_timeout(Duration::from_secs(config.llm_timeout_secs))
    .with_retry(inner.retry.clone())
    .with_max_repairs(config.max_repairs);

    let mut team = inner
        .pipeline
        .hire(config.loop_review)
        .with_events(events.clone());
    team.run_project(description);

    events.emit(Event::RunStarted {
        run_id: record.id.clone(),
        pipeline: inner.pipeline.to_string(),
        n_round: config.n_round,
    });

    let result = team
        .run(config.n_round, config.concurrent_agents, &ctx)
        .await;
    record.set_spent(ledger.spent());

    match result {
        Ok(report) => {
            record.complete(&report);
            save(store, &record).await?;
            if report.passed {
                info!(run_id = %record.id, rounds = report.rounds, spent = record.spent, "run passed");
            } else {
                warn!(
                    run_id = %record.id,
                    termination = ?report.termination,
                    rounds = report.rounds,
                    "run ended without a pass"
                );
            }
            Ok(RunOutput {
                run_id: record.id,
                report,
            })
        }
        Err(e) => {
            error!(run_id = %record.id, error = %e, "run aborted");
            record.fail(e.to_string(), team.history());
            if let Err(save_err) = save(store, &record).await {
                error!(error = %save_err, "failed to save aborted run");
            }
            Err(e)
        }
    }
}
