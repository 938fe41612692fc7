//! Protocol errors raised by the round controller, task queue and router.
//!
//! Every variant signals a broken invocation sequence, not a transient
//! fault, and is never retried automatically. `TurnTimedOut` is the one
//! exception: the turn orchestrator may re-enqueue under the `retry` policy.

use crate::core::queue::TaskId;
use crate::core::types::Role;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebateError {
    /// Round or session lifecycle violated.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A role result arrived before its predecessor completed.
    #[error("out of order: expected {}, got {got}", expected_label(.expected))]
    OutOfOrder { expected: Option<Role>, got: Role },

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    /// Completion must be reported exactly once per task.
    #[error("task {0} already completed")]
    AlreadyCompleted(TaskId),

    #[error("no open round")]
    NoOpenRound,

    #[error("session has no rounds")]
    NoRounds,

    /// A round is missing role results where a complete round is required.
    #[error("round {index} is incomplete (missing: {})", roles_label(.missing))]
    IncompleteRound { index: u32, missing: Vec<Role> },

    /// An agent did not report within the turn deadline.
    #[error("{role} turn in round {round} timed out after {timeout_secs}s")]
    TurnTimedOut {
        role: Role,
        round: u32,
        timeout_secs: u64,
    },
}

fn expected_label(expected: &Option<Role>) -> String {
    match expected {
        Some(role) => role.to_string(),
        None => "no further role (round complete)".to_string(),
    }
}

fn roles_label(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_roles_involved() {
        let err = DebateError::OutOfOrder {
            expected: Some(Role::Advocate),
            got: Role::Judge,
        };
        assert_eq!(err.to_string(), "out of order: expected advocate, got judge");

        let err = DebateError::IncompleteRound {
            index: 2,
            missing: vec![Role::Judge, Role::Scribe],
        };
        assert_eq!(
            err.to_string(),
            "round 2 is incomplete (missing: judge, scribe)"
        );
    }
}
