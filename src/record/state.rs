use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::ActionKind;
use crate::agents::Message;
use crate::runtime::{RunReport, Termination};

/// Everything worth keeping about one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run identifier
    pub id: String,

    /// The algorithm description the run started from
    pub requirement: String,

    /// Pipeline preset name
    pub pipeline: String,

    pub status: RecordStatus,

    /// Why the round loop stopped; unset while running or after a fault
    pub termination: Option<Termination>,

    pub rounds: usize,

    /// Every message posted, in order
    pub messages: Vec<Message>,

    pub call_counts: BTreeMap<ActionKind, usize>,

    /// Estimated model spend in dollars
    pub spent: f64,

    pub build_dir: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Error message if the run aborted
    pub error: Option<String>,
}

impl RunRecord {
    pub fn new(
        requirement: impl Into<String>,
        pipeline: impl Into<String>,
        build_dir: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            requirement: requirement.into(),
            pipeline: pipeline.into(),
            status: RecordStatus::Running,
            termination: None,
            rounds: 0,
            messages: Vec::new(),
            call_counts: BTreeMap::new(),
            spent: 0.0,
            build_dir: build_dir.into(),
            created_at: now,
            updated_at: now,
            error: None,
        }
    }

    /// Fill in the outcome of a finished round loop.
    pub fn complete(&mut self, report: &RunReport) {
        self.status = if report.passed {
            RecordStatus::Passed
        } else {
            RecordStatus::Exhausted
        };
        self.termination = Some(report.termination);
        self.rounds = report.rounds;
        self.messages = report.messages.clone();
        self.call_counts = report.call_counts.clone();
        self.updated_at = Utc::now();
    }

    /// Mark the run as aborted, keeping whatever was posted before the fault.
    pub fn fail(&mut self, error: impl Into<String>, messages: &[Message]) {
        self.status = RecordStatus::Failed;
        self.error = Some(error.into());
        self.messages = messages.to_vec();
        self.updated_at = Utc::now();
    }

    pub fn set_spent(&mut self, spent: f64) {
        self.spent = spent;
        self.updated_at = Utc::now();
    }

    /// Human-readable transcript of the message history.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let target = match m.destination {
                    crate::agents::Destination::Broadcast => "all".to_string(),
                    crate::agents::Destination::To(role) => role.to_string(),
                };
                format!(
                    "#{} {} -> {} [{} {:?}]\n{}\n",
                    i + 1,
                    m.sender,
                    target,
                    m.produced_by,
                    m.status,
                    m.content.trim_end()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Status of a recorded run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Run started and has not finished
    #[default]
    Running,
    /// Quiescent with a pass verdict last
    Passed,
    /// Budget used up, or quiescent without a pass
    Exhausted,
    /// Aborted by an error
    Failed,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Passed => write!(f, "passed"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RecordStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(Self::Running),
            "passed" => Ok(Self::Passed),
            "exhausted" => Ok(Self::Exhausted),
            "failed" => Ok(Self::Failed),
            _ => anyhow::bail!(
                "invalid run status '{}' (expected: running, passed, exhausted, failed)",
                s
            ),
        }
    }
}

/// Summary of a run for listing (without the message history)
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub id: String,
    pub requirement: String,
    pub pipeline: String,
    pub status: RecordStatus,
    pub rounds: usize,
    pub created_at: String,
    pub error: Option<String>,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let first_line = self.requirement.lines().next().unwrap_or_default();
        let preview: String = if first_line.chars().count() > 50 {
            first_line.chars().take(47).collect::<String>() + "..."
        } else {
            first_line.to_string()
        };

        let id_short: String = self.id.chars().take(8).collect();

        write!(
            f,
            "{:<10} {:<10} {:<9} {:>3} {}",
            id_short, self.status, self.pipeline, self.rounds, preview
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Role;

    fn report(passed: bool) -> RunReport {
        RunReport {
            termination: Termination::Quiescent,
            rounds: 4,
            messages: vec![
                Message::requirement("sort"),
                Message::new("ok", ActionKind::RunCode, Role::TestExecutor).passed(),
            ],
            call_counts: BTreeMap::from([(ActionKind::RunCode, 1)]),
            passed,
        }
    }

    #[test]
    fn complete_copies_the_report() {
        let mut record = RunRecord::new("sort", "software", "build");
        record.complete(&report(true));

        assert_eq!(record.status, RecordStatus::Passed);
        assert_eq!(record.termination, Some(Termination::Quiescent));
        assert_eq!(record.rounds, 4);
        assert_eq!(record.messages.len(), 2);

        record.complete(&report(false));
        assert_eq!(record.status, RecordStatus::Exhausted);
    }

    #[test]
    fn fail_keeps_partial_history() {
        let mut record = RunRecord::new("sort", "full", "build");
        record.fail("routing fault", &[Message::requirement("sort")]);

        assert_eq!(record.status, RecordStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("routing fault"));
        assert_eq!(record.messages.len(), 1);
        assert!(record.termination.is_none());
    }

    #[test]
    fn transcript_shows_routing() {
        let mut record = RunRecord::new("sort", "software", "build");
        record.complete(&report(true));
        let text = record.transcript();

        assert!(text.contains("#1 Human -> all [UserRequirement Artifact]"));
        assert!(text.contains("#2 TestExecutor -> all [RunCode Passed]"));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("PASSED".parse::<RecordStatus>().unwrap(), RecordStatus::Passed);
        assert!("done".parse::<RecordStatus>().is_err());
    }
}
