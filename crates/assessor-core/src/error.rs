//! Engine error types.
//!
//! Policy denials, caller misuse, learner-recoverable incompleteness and
//! persistence failures are distinct variants so callers can classify an
//! error without string matching.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::model::QuestionId;
use crate::session::SessionState;

/// Why the attempt policy refused a new attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The due date has passed and late submission is not allowed.
    PastDue,
    /// The learner has used every allowed attempt.
    MaxAttemptsReached { used: u32, max: u32 },
    /// The prerequisite gate (e.g. video progress) is not satisfied.
    PrerequisiteUnmet,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::PastDue => write!(f, "the due date has passed"),
            DenialReason::MaxAttemptsReached { used, max } => {
                write!(f, "maximum attempts reached ({used}/{max})")
            }
            DenialReason::PrerequisiteUnmet => write!(f, "prerequisite not satisfied"),
        }
    }
}

/// Errors returned by the session state machine and orchestrator.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The attempt policy denied starting or retaking.
    #[error("attempt not permitted: {0}")]
    AttemptNotPermitted(DenialReason),

    /// The operation is not legal in the current state.
    #[error("cannot {action} while {state}")]
    InvalidStateTransition {
        state: SessionState,
        action: &'static str,
    },

    /// Required questions are unanswered on a manual submit.
    #[error("{} required question(s) unanswered", missing.len())]
    IncompleteSubmission { missing: Vec<QuestionId> },

    /// An answer or grade referenced a question outside the question set.
    #[error("unknown question: {0}")]
    UnknownQuestion(QuestionId),

    /// The store failed to save a completed attempt.
    #[error("failed to persist attempt {attempt_id}: {source:#}")]
    PersistenceFailure {
        attempt_id: Uuid,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    /// Returns `true` for policy denials (as opposed to caller misuse).
    pub fn is_policy_denial(&self) -> bool {
        matches!(self, EngineError::AttemptNotPermitted(_))
    }

    /// Returns `true` if the learner or caller can retry the same action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::IncompleteSubmission { .. } | EngineError::PersistenceFailure { .. }
        )
    }
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let denied = EngineError::AttemptNotPermitted(DenialReason::PastDue);
        assert!(denied.is_policy_denial());
        assert!(!denied.is_recoverable());

        let incomplete = EngineError::IncompleteSubmission {
            missing: vec!["q1".into()],
        };
        assert!(incomplete.is_recoverable());
        assert!(!incomplete.is_policy_denial());

        let misuse = EngineError::InvalidStateTransition {
            state: SessionState::NotStarted,
            action: "answer",
        };
        assert!(!misuse.is_policy_denial());
        assert!(!misuse.is_recoverable());
        assert_eq!(misuse.to_string(), "cannot answer while not started");
    }

    #[test]
    fn denial_messages() {
        let err = EngineError::AttemptNotPermitted(DenialReason::MaxAttemptsReached {
            used: 3,
            max: 3,
        });
        assert_eq!(
            err.to_string(),
            "attempt not permitted: maximum attempts reached (3/3)"
        );
    }
}
