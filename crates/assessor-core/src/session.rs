//! Attempt session state machine.
//!
//! ```text
//! NotStarted --start--> InProgress --submit / timer expiry--> Submitted --review--> Reviewed
//!     ^                     |                                     |                   |
//!     +-------leave---------+                                     +------retake-------+
//! ```
//!
//! A session exclusively owns its answer store and countdown. Ticks are fed
//! in by the caller (see [`crate::ticker`]) and carry a [`TimerToken`], so a
//! tick from a cancelled countdown can never touch the session.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::answers::AnswerStore;
use crate::clock::Clock;
use crate::countdown::{Countdown, CountdownEvent, TickScheduler, TimerToken};
use crate::error::{EngineError, EngineResult};
use crate::grading;
use crate::model::{AnswerValue, AssessmentConfig, AssessmentResult, Attempt};
use crate::penalty;
use crate::policy::{self, PolicyContext};
use crate::visibility;

/// Lifecycle state of the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    /// Graded; feedback not yet requested.
    Submitted,
    Reviewed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NotStarted => write!(f, "not started"),
            SessionState::InProgress => write!(f, "in progress"),
            SessionState::Submitted => write!(f, "submitted"),
            SessionState::Reviewed => write!(f, "reviewed"),
        }
    }
}

/// What ended the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    TimerExpired,
}

/// Result of a submit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    /// The attempt was already completed; nothing changed.
    AlreadySubmitted,
}

/// Result of feeding one tick to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stale token, no live countdown, or attempt not in progress.
    Ignored,
    Ticked { remaining_seconds: u64 },
    /// The countdown reached zero and the attempt was submitted.
    AutoSubmitted,
}

/// Runs one learner's attempts at one assessment.
pub struct AttemptSession {
    config: AssessmentConfig,
    user_id: String,
    prior_attempts: Vec<Attempt>,
    prerequisite_satisfied: bool,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn TickScheduler>,
    state: SessionState,
    answers: AnswerStore,
    attempt: Option<Attempt>,
    countdown: Option<Countdown>,
    generation: u64,
    persisted: bool,
}

impl AttemptSession {
    pub fn new(
        config: AssessmentConfig,
        user_id: &str,
        prior_attempts: Vec<Attempt>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn TickScheduler>,
    ) -> Self {
        Self {
            config,
            user_id: user_id.to_string(),
            prior_attempts,
            prerequisite_satisfied: true,
            clock,
            scheduler,
            state: SessionState::NotStarted,
            answers: AnswerStore::new(),
            attempt: None,
            countdown: None,
            generation: 0,
            persisted: false,
        }
    }

    /// Record the prerequisite gate result consulted by `start` and `retake`.
    pub fn with_prerequisite(mut self, satisfied: bool) -> Self {
        self.prerequisite_satisfied = satisfied;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The current attempt, in progress or completed.
    pub fn attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref()
    }

    /// The current attempt once it has been submitted.
    pub fn completed_attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref().filter(|a| a.is_completed())
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    /// Attempts known to the session, including ones completed here.
    pub fn prior_attempts(&self) -> &[Attempt] {
        &self.prior_attempts
    }

    /// Seconds left on the live countdown, `None` when untimed or stopped.
    pub fn remaining_seconds(&self) -> Option<u64> {
        self.countdown
            .as_ref()
            .filter(|c| c.is_running())
            .map(Countdown::remaining_seconds)
    }

    /// Token of the live countdown.
    pub fn timer_token(&self) -> Option<TimerToken> {
        self.countdown
            .as_ref()
            .filter(|c| c.is_running())
            .map(Countdown::token)
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Mark the completed attempt as saved by the store.
    pub fn mark_persisted(&mut self) {
        if self.completed_attempt().is_some() {
            self.persisted = true;
        }
    }

    /// Whether the policy would allow a new attempt right now.
    pub fn can_start(&self) -> bool {
        policy::can_start_or_resubmit(&self.config, &self.prior_attempts, self.policy_context())
    }

    /// Begin a fresh attempt.
    pub fn start(&mut self) -> EngineResult<&Attempt> {
        self.expect_state(&[SessionState::NotStarted], "start")?;
        self.check_policy()?;

        self.cancel_countdown();
        self.answers.clear();
        self.persisted = false;

        let attempt = Attempt::new(&self.config.id, &self.user_id, self.clock.now());
        if let Some(total_seconds) = self.config.time_limit.as_seconds() {
            self.generation += 1;
            let token = TimerToken {
                attempt_id: attempt.id,
                generation: self.generation,
            };
            self.countdown = Some(Countdown::start(token, total_seconds, &*self.scheduler));
        }

        tracing::info!(
            attempt_id = %attempt.id,
            subject_id = %self.config.id,
            user_id = %self.user_id,
            "attempt started"
        );
        self.state = SessionState::InProgress;
        Ok(&*self.attempt.insert(attempt))
    }

    /// Record an answer, replacing any earlier one for the same question.
    pub fn answer(&mut self, question_id: &str, value: AnswerValue) -> EngineResult<()> {
        self.expect_state(&[SessionState::InProgress], "answer")?;
        if self.config.question(question_id).is_none() {
            return Err(EngineError::UnknownQuestion(question_id.to_string()));
        }
        tracing::debug!(question_id, "answer recorded");
        self.answers.set_answer(question_id, value);
        Ok(())
    }

    /// Manual submit. Rejected while required questions are unanswered.
    pub fn submit(&mut self) -> EngineResult<SubmitOutcome> {
        match self.state {
            SessionState::Submitted | SessionState::Reviewed => {
                tracing::debug!("submit ignored, attempt already completed");
                return Ok(SubmitOutcome::AlreadySubmitted);
            }
            SessionState::NotStarted => {
                return Err(EngineError::InvalidStateTransition {
                    state: self.state,
                    action: "submit",
                });
            }
            SessionState::InProgress => {}
        }

        let missing = self.answers.missing_required(&self.config);
        if !missing.is_empty() {
            return Err(EngineError::IncompleteSubmission { missing });
        }

        self.complete(SubmitTrigger::Manual);
        Ok(SubmitOutcome::Submitted)
    }

    /// Feed one tick from the scheduler.
    pub fn on_tick(&mut self, token: TimerToken) -> TickOutcome {
        if self.state != SessionState::InProgress {
            return TickOutcome::Ignored;
        }
        let Some(countdown) = self.countdown.as_mut().filter(|c| c.token() == token) else {
            tracing::warn!(
                attempt_id = %token.attempt_id,
                generation = token.generation,
                "stale tick ignored"
            );
            return TickOutcome::Ignored;
        };

        match countdown.tick() {
            Some(CountdownEvent::Tick { remaining_seconds }) => {
                TickOutcome::Ticked { remaining_seconds }
            }
            Some(CountdownEvent::Expired) => {
                self.complete(SubmitTrigger::TimerExpired);
                TickOutcome::AutoSubmitted
            }
            None => TickOutcome::Ignored,
        }
    }

    /// Graded feedback for the completed attempt, filtered by the visibility gate.
    pub fn review(&mut self) -> EngineResult<AssessmentResult> {
        self.expect_state(&[SessionState::Submitted, SessionState::Reviewed], "review")?;
        let attempt = self
            .completed_attempt()
            .cloned()
            .ok_or(EngineError::InvalidStateTransition {
                state: self.state,
                action: "review",
            })?;

        let grade = grading::grade(&attempt, &self.config);
        let can_view_answers = visibility::can_view_answers(&self.config, self.clock.now());
        self.state = SessionState::Reviewed;

        Ok(AssessmentResult {
            attempt,
            feedback: visibility::filter_feedback(grade.feedback, can_view_answers),
            can_view_answers,
        })
    }

    /// Return to `NotStarted` for another attempt, if the policy allows one.
    pub fn retake(&mut self) -> EngineResult<()> {
        self.expect_state(&[SessionState::Submitted, SessionState::Reviewed], "retake")?;
        self.check_policy()?;

        self.cancel_countdown();
        self.answers.clear();
        self.attempt = None;
        self.persisted = false;
        self.state = SessionState::NotStarted;
        tracing::info!(subject_id = %self.config.id, user_id = %self.user_id, "retake");
        Ok(())
    }

    /// Leave the assessment: stop the countdown and drop an unsubmitted attempt.
    pub fn leave(&mut self) {
        self.cancel_countdown();
        if self.state == SessionState::InProgress {
            if let Some(attempt) = self.attempt.take() {
                tracing::info!(attempt_id = %attempt.id, "in-progress attempt discarded");
            }
            self.answers.clear();
            self.state = SessionState::NotStarted;
        }
    }

    fn complete(&mut self, trigger: SubmitTrigger) {
        self.cancel_countdown();
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        if attempt.is_completed() {
            return;
        }

        let completed_at = self.clock.now().max(attempt.started_at);
        attempt.answers = self.answers.snapshot();
        attempt.completed_at = Some(completed_at);
        attempt.time_spent_seconds =
            u64::try_from((completed_at - attempt.started_at).num_seconds()).unwrap_or(0);
        attempt.is_late = penalty::is_late(completed_at, self.config.due_date);
        attempt.auto_submitted = trigger == SubmitTrigger::TimerExpired;
        grading::score_attempt(attempt, &self.config);

        tracing::info!(
            attempt_id = %attempt.id,
            trigger = ?trigger,
            raw_score = ?attempt.raw_score_percent,
            final_score = ?attempt.final_score_percent,
            late = attempt.is_late,
            "attempt submitted"
        );

        self.prior_attempts.push(attempt.clone());
        self.persisted = false;
        self.state = SessionState::Submitted;
    }

    fn cancel_countdown(&mut self) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.cancel();
        }
    }

    fn policy_context(&self) -> PolicyContext {
        PolicyContext {
            now: self.clock.now(),
            prerequisite_satisfied: self.prerequisite_satisfied,
        }
    }

    fn check_policy(&self) -> EngineResult<()> {
        policy::check_start(&self.config, &self.prior_attempts, self.policy_context()).map_err(
            |reason| {
                tracing::warn!(
                    subject_id = %self.config.id,
                    user_id = %self.user_id,
                    %reason,
                    "attempt denied"
                );
                EngineError::AttemptNotPermitted(reason)
            },
        )
    }

    fn expect_state(&self, allowed: &[SessionState], action: &'static str) -> EngineResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EngineError::InvalidStateTransition {
                state: self.state,
                action,
            })
        }
    }
}

impl fmt::Debug for AttemptSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptSession")
            .field("subject_id", &self.config.id)
            .field("user_id", &self.user_id)
            .field("state", &self.state)
            .field("attempt_id", &self.attempt.as_ref().map(|a| a.id))
            .field("remaining_seconds", &self.remaining_seconds())
            .finish()
    }
}
