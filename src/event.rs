use tokio::sync::mpsc;

use crate::actions::ActionKind;
use crate::agents::{Destination, MessageStatus, Role};

/// Events emitted during a run.
///
/// Consumers receive these through [`RunHandle::next_event()`](crate::RunHandle::next_event).
#[derive(Debug, Clone)]
pub enum Event {
    /// The team was assembled and the requirement published
    RunStarted {
        run_id: String,
        pipeline: String,
        n_round: usize,
    },
    /// A round began; `recipients` agents received messages
    RoundStarted { round: usize, recipients: usize },
    /// An agent is about to think and act
    AgentActing { round: usize, role: Role },
    /// A message was posted to the bus at the end of a round
    MessagePosted {
        round: usize,
        sender: Role,
        produced_by: ActionKind,
        status: MessageStatus,
        destination: Destination,
    },
    /// A round delivered nothing; the run stops early
    Quiescent { round: usize },
    /// The entire run completed
    RunCompleted { status: RunStatus },
    /// A non-fatal warning
    Warning { message: String },
}

/// Status of a completed run
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Quiescent with a pass verdict as the last message
    Passed,
    /// Round budget used up, or quiescent without a pass
    Exhausted,
    Failed { error: String },
}

/// Sender for run events.
///
/// Wraps a `tokio::sync::mpsc::Sender<Event>`. If constructed with `noop()`,
/// all sends are silently dropped.
#[derive(Clone, Default)]
pub struct EventSender {
    inner: Option<mpsc::Sender<Event>>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self {
            inner: Some(sender),
        }
    }

    /// Create a no-op sender that silently drops all events.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Emit a non-critical event (best-effort, drops on backpressure).
    pub fn emit(&self, event: Event) {
        if let Some(ref sender) = self.inner {
            let _ = sender.try_send(event);
        }
    }

    /// Emit a critical event, waiting for capacity.
    pub async fn emit_blocking(&self, event: Event) {
        if let Some(ref sender) = self.inner {
            let _ = sender.send(event).await;
        }
    }

    /// Returns true if this sender is connected (not noop).
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }
}
