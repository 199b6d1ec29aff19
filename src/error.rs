use std::path::PathBuf;

use crate::actions::ActionKind;
use crate::agents::Role;

#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("provider error: {0}")]
    Provider(String),

    /// An agent received a message its routing table has no transition for.
    #[error("routing fault: {role} has no transition for {produced_by} sent by {sender}")]
    Routing {
        role: Role,
        produced_by: ActionKind,
        sender: Role,
    },

    #[error("action error: {action}: {message}")]
    Action { action: ActionKind, message: String },

    #[error("tool error: {tool}: {message}")]
    Tool { tool: String, message: String },

    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("investment budget exceeded: spent ${spent:.4} of ${budget:.4}")]
    BudgetExceeded { spent: f64, budget: f64 },

    #[error("repair limit reached: {role} already ran {limit} fix actions")]
    RepairLimit { role: Role, limit: usize },

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ForgeError {
    /// Recover a typed error that travelled through `anyhow`, or wrap the
    /// failure as an error of `action`.
    pub(crate) fn from_action(action: ActionKind, err: anyhow::Error) -> Self {
        match err.downcast::<ForgeError>() {
            Ok(forge) => forge,
            Err(other) => ForgeError::Action {
                action,
                message: format!("{:#}", other),
            },
        }
    }

    /// Whether this error is a routing fault.
    pub fn is_routing_fault(&self) -> bool {
        matches!(self, Self::Routing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_survive_anyhow_context() {
        let err = anyhow::Error::new(ForgeError::BudgetExceeded {
            spent: 3.5,
            budget: 3.0,
        })
        .context("model call failed");

        let recovered = ForgeError::from_action(ActionKind::WriteAlgorithmCode, err);
        assert!(matches!(recovered, ForgeError::BudgetExceeded { .. }));
    }

    #[test]
    fn untyped_errors_become_action_errors() {
        let err = anyhow::anyhow!("disk on fire");
        let wrapped = ForgeError::from_action(ActionKind::CompileCode, err);

        match wrapped {
            ForgeError::Action { action, message } => {
                assert_eq!(action, ActionKind::CompileCode);
                assert!(message.contains("disk on fire"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn routing_fault_names_role_and_kind() {
        let err = ForgeError::Routing {
            role: Role::CodeProgrammer,
            produced_by: ActionKind::CosimulateHls,
            sender: Role::HlsBuildAssistant,
        };
        let text = err.to_string();
        assert!(text.contains("CodeProgrammer"));
        assert!(text.contains("CosimulateHls"));
        assert!(err.is_routing_fault());
    }
}
