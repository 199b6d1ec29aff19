use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ForgeError;
use crate::event::Event;
use crate::runtime::RunReport;

/// Output from a completed run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: String,
    pub report: RunReport,
}

/// Handle to a running pipeline.
///
/// Provides an event stream for monitoring progress and a way to wait
/// for the final report.
///
/// ```no_run
/// # use nl2hls::{RunHandle, RunOutput, ForgeError};
/// # async fn example(mut handle: RunHandle) -> Result<RunOutput, ForgeError> {
/// while let Some(event) = handle.next_event().await {
///     println!("Event: {:?}", event);
/// }
/// handle.wait().await
/// # }
/// ```
pub struct RunHandle {
    events: mpsc::Receiver<Event>,
    completion: JoinHandle<Result<RunOutput, ForgeError>>,
}

impl RunHandle {
    pub(crate) fn new(
        events: mpsc::Receiver<Event>,
        completion: JoinHandle<Result<RunOutput, ForgeError>>,
    ) -> Self {
        Self { events, completion }
    }

    /// Receive the next event.
    ///
    /// Returns `None` when the event stream is closed (run is complete or failed).
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Wait for the run to complete and return its output.
    pub async fn wait(self) -> Result<RunOutput, ForgeError> {
        self.completion
            .await
            .map_err(|e| ForgeError::Internal(anyhow::anyhow!("task join error: {}", e)))?
    }

    /// Drain all events and wait for the result.
    pub async fn output(mut self) -> Result<RunOutput, ForgeError> {
        // Drain events to avoid backpressure blocking the task
        while self.events.recv().await.is_some() {}
        self.wait().await
    }
}
