use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;
use crate::actions::ActionKind;

/// Unique identifier for a message
pub type MessageId = String;

/// Whether a message carries work, a pass verdict or a failure to repair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Generated code, test cases, lists and other intermediate results
    Artifact,
    Passed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    /// Every agent that watches the producing action
    Broadcast,
    To(Role),
}

/// A message passed between agents. Immutable once posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub produced_by: ActionKind,
    pub sender: Role,
    pub destination: Destination,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A broadcast artifact.
    pub fn new(content: impl Into<String>, produced_by: ActionKind, sender: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            produced_by,
            sender,
            destination: Destination::Broadcast,
            status: MessageStatus::Artifact,
            created_at: Utc::now(),
        }
    }

    /// The human's initial requirement.
    pub fn requirement(content: impl Into<String>) -> Self {
        Self::new(content, ActionKind::UserRequirement, Role::Human)
    }

    pub fn to(mut self, role: Role) -> Self {
        self.destination = Destination::To(role);
        self
    }

    pub fn passed(mut self) -> Self {
        self.status = MessageStatus::Passed;
        self
    }

    pub fn failed(mut self) -> Self {
        self.status = MessageStatus::Failed;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == MessageStatus::Failed
    }

    pub fn is_passed(&self) -> bool {
        self.status == MessageStatus::Passed
    }

    /// Whether `role` should receive this message given what it watches.
    ///
    /// Addressed messages reach only their addressee. Broadcasts reach every
    /// watcher except the sender.
    pub fn is_for(&self, role: Role, watch: &[ActionKind]) -> bool {
        match self.destination {
            Destination::To(target) => target == role,
            Destination::Broadcast => self.sender != role && watch.contains(&self.produced_by),
        }
    }
}
