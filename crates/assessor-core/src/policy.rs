//! Attempt gating: may the learner begin (or retake) an attempt?

use chrono::{DateTime, Utc};

use crate::error::DenialReason;
use crate::model::{AssessmentConfig, Attempt, AttemptLimit};

/// Inputs the policy needs beyond the configuration and prior attempts.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext {
    pub now: DateTime<Utc>,
    /// Result of the prerequisite gate. Ignored unless the subject requires it.
    pub prerequisite_satisfied: bool,
}

/// Number of attempts that count against the attempt cap.
pub fn completed_attempts(prior_attempts: &[Attempt]) -> u32 {
    let count = prior_attempts.iter().filter(|a| a.is_completed()).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Decide whether a new attempt may begin.
///
/// Checks run in order: prerequisite, due date, attempt cap. An already
/// passed assessment may be retaken while attempts remain.
pub fn check_start(
    config: &AssessmentConfig,
    prior_attempts: &[Attempt],
    ctx: PolicyContext,
) -> Result<(), DenialReason> {
    if config.requires_prerequisite && !ctx.prerequisite_satisfied {
        return Err(DenialReason::PrerequisiteUnmet);
    }

    if let Some(due) = config.due_date {
        if ctx.now > due && !config.allow_late_submission {
            return Err(DenialReason::PastDue);
        }
    }

    if let AttemptLimit::Limited(max) = config.max_attempts {
        let used = completed_attempts(prior_attempts);
        if used >= max {
            return Err(DenialReason::MaxAttemptsReached { used, max });
        }
    }

    Ok(())
}

/// Boolean form of [`check_start`].
pub fn can_start_or_resubmit(
    config: &AssessmentConfig,
    prior_attempts: &[Attempt],
    ctx: PolicyContext,
) -> bool {
    check_start(config, prior_attempts, ctx).is_ok()
}

/// Attempts left before the cap, `None` when unlimited.
pub fn attempts_remaining(config: &AssessmentConfig, prior_attempts: &[Attempt]) -> Option<u32> {
    match config.max_attempts {
        AttemptLimit::Unlimited => None,
        AttemptLimit::Limited(max) => Some(max.saturating_sub(completed_attempts(prior_attempts))),
    }
}
