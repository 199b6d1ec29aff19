use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::MessageBus;
use crate::actions::{ActionContext, ActionKind};
use crate::agents::{Agent, Destination, Message, Role};
use crate::error::ForgeError;
use crate::event::{Event, EventSender};

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// A round had nothing to deliver
    Quiescent,
    /// The round budget was used up with messages still pending
    BudgetExhausted,
}

/// Outcome of [`Team::run`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub termination: Termination,
    /// Rounds in which at least one agent acted
    pub rounds: usize,
    pub messages: Vec<Message>,
    pub call_counts: BTreeMap<ActionKind, usize>,
    /// Quiescent with a pass verdict as the final message
    pub passed: bool,
}

/// A roster of agents sharing a message bus.
pub struct Team {
    agents: Vec<Box<dyn Agent>>,
    bus: MessageBus,
    events: EventSender,
}

impl Team {
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            bus: MessageBus::new(),
            events: EventSender::noop(),
        }
    }

    /// Add an agent. Roster order is delivery and output order.
    pub fn hire(mut self, agent: impl Agent + 'static) -> Self {
        self.agents.push(Box::new(agent));
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Post the human's requirement.
    pub fn run_project(&mut self, requirement: impl Into<String>) {
        self.publish(Message::requirement(requirement));
    }

    pub fn publish(&mut self, message: Message) {
        self.bus.publish(message);
    }

    pub fn roles(&self) -> Vec<Role> {
        self.agents.iter().map(|a| a.role()).collect()
    }

    pub fn agent(&self, role: Role) -> Option<&dyn Agent> {
        self.agents
            .iter()
            .find(|a| a.role() == role)
            .map(|a| a.as_ref())
    }

    /// Every message posted so far, including those of a failed run.
    pub fn history(&self) -> &[Message] {
        self.bus.history()
    }

    /// Deliver a snapshot in roster order; returns which agents received
    /// anything.
    fn deliver(&mut self, snapshot: &[Message]) -> Vec<bool> {
        let mut received = vec![false; self.agents.len()];

        for message in snapshot {
            let mut delivered = false;
            for (i, agent) in self.agents.iter_mut().enumerate() {
                if agent.core().receives(message) {
                    agent.core_mut().memory.push(message.clone());
                    received[i] = true;
                    delivered = true;
                }
            }

            if !delivered {
                if let Destination::To(role) = message.destination {
                    let text = format!(
                        "{} from {} is addressed to {}, who is not on the team",
                        message.produced_by, message.sender, role
                    );
                    warn!("{}", text);
                    self.events.emit(Event::Warning { message: text });
                }
            }
        }
        received
    }

    /// Run rounds until quiescence or until `n_round` rounds have acted.
    ///
    /// Every agent of a round sees only messages posted before the round
    /// began; outputs are posted after all of them finish, in roster order.
    pub async fn run(
        &mut self,
        n_round: usize,
        concurrent: bool,
        ctx: &ActionContext,
    ) -> Result<RunReport, ForgeError> {
        ctx.recorder().reset();
        for agent in &mut self.agents {
            agent.core_mut().reset();
        }

        let mut rounds = 0;
        let termination = loop {
            let snapshot = self.bus.take_snapshot();
            let received = self.deliver(&snapshot);
            let recipients = received.iter().filter(|r| **r).count();

            if recipients == 0 {
                info!(round = rounds, "no agent has pending work");
                self.events.emit(Event::Quiescent { round: rounds });
                break Termination::Quiescent;
            }
            if rounds >= n_round {
                warn!(n_round, pending = recipients, "round budget exhausted");
                break Termination::BudgetExhausted;
            }

            rounds += 1;
            info!(round = rounds, recipients, "round started");
            self.events.emit(Event::RoundStarted {
                round: rounds,
                recipients,
            });

            let outputs = self.react_all(&received, rounds, concurrent, ctx).await?;
            for message in outputs {
                info!(
                    round = rounds,
                    sender = %message.sender,
                    produced_by = %message.produced_by,
                    status = ?message.status,
                    "message posted"
                );
                self.events.emit(Event::MessagePosted {
                    round: rounds,
                    sender: message.sender,
                    produced_by: message.produced_by,
                    status: message.status,
                    destination: message.destination,
                });
                self.bus.publish(message);
            }
        };

        let messages = self.bus.history().to_vec();
        let passed = termination == Termination::Quiescent
            && messages.last().is_some_and(|m| m.is_passed());

        Ok(RunReport {
            termination,
            rounds,
            messages,
            call_counts: ctx.recorder().counts(),
            passed,
        })
    }

    async fn react_all(
        &mut self,
        received: &[bool],
        round: usize,
        concurrent: bool,
        ctx: &ActionContext,
    ) -> Result<Vec<Message>, ForgeError> {
        let events = self.events.clone();
        let acting = self
            .agents
            .iter_mut()
            .zip(received)
            .filter(|(_, r)| **r)
            .map(|(agent, _)| agent);

        let result = if concurrent {
            try_join_all(acting.map(|agent| {
                events.emit(Event::AgentActing {
                    round,
                    role: agent.role(),
                });
                agent.react(ctx)
            }))
            .await
        } else {
            let mut outputs = Vec::new();
            let mut failure = None;
            for agent in acting {
                events.emit(Event::AgentActing {
                    round,
                    role: agent.role(),
                });
                match agent.react(ctx).await {
                    Ok(message) => outputs.push(message),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            match failure {
                Some(e) => Err(e),
                None => Ok(outputs),
            }
        };

        if let Err(e) = &result {
            error!(round, error = %e, "run aborted");
        }
        result
    }
}

impl Default for Team {
    fn default() -> Self {
        Self::new()
    }
}
