//! Assessment engine orchestrator.
//!
//! Wires the session state machine to its collaborators: loads the question
//! set and attempt history, resolves the prerequisite gate, and awaits
//! persistence of a completed attempt before handing back its review.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::clock::Clock;
use crate::countdown::TickScheduler;
use crate::error::{EngineError, EngineResult};
use crate::grading;
use crate::model::{AssessmentResult, Attempt, QuestionId};
use crate::session::AttemptSession;
use crate::traits::{AssessmentStore, NoPrerequisite, PrerequisiteGate};

/// The central assessment engine.
pub struct AssessmentEngine {
    store: Arc<dyn AssessmentStore>,
    gate: Arc<dyn PrerequisiteGate>,
    clock: Arc<dyn Clock>,
}

impl AssessmentEngine {
    pub fn new(store: Arc<dyn AssessmentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            gate: Arc::new(NoPrerequisite),
            clock,
        }
    }

    /// Consult `gate` for subjects that require a prerequisite.
    pub fn with_gate(mut self, gate: Arc<dyn PrerequisiteGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Load everything a learner needs to take `subject_id`.
    pub async fn open_session(
        &self,
        user_id: &str,
        subject_id: &str,
        scheduler: Arc<dyn TickScheduler>,
    ) -> Result<AttemptSession> {
        let config = self
            .store
            .load_question_set(subject_id)
            .await
            .with_context(|| format!("failed to load question set '{subject_id}'"))?;

        let prior_attempts = self
            .store
            .load_prior_attempts(user_id, subject_id)
            .await
            .with_context(|| format!("failed to load attempts of '{user_id}' at '{subject_id}'"))?;

        let prerequisite_satisfied = if config.requires_prerequisite {
            self.gate
                .is_prerequisite_satisfied(user_id, subject_id)
                .await
                .context("failed to check prerequisite")?
        } else {
            true
        };

        tracing::debug!(
            store = self.store.name(),
            subject_id,
            user_id,
            prior = prior_attempts.len(),
            prerequisite_satisfied,
            "session opened"
        );

        Ok(AttemptSession::new(
            config,
            user_id,
            prior_attempts,
            Arc::clone(&self.clock),
            scheduler,
        )
        .with_prerequisite(prerequisite_satisfied))
    }

    /// Save the session's completed attempt. A no-op once saved.
    ///
    /// On failure the session stays submitted and the call can be retried;
    /// the attempt is not graded again.
    pub async fn persist(&self, session: &mut AttemptSession) -> EngineResult<()> {
        let attempt = session
            .completed_attempt()
            .ok_or(EngineError::InvalidStateTransition {
                state: session.state(),
                action: "persist",
            })?;
        if session.is_persisted() {
            return Ok(());
        }

        if let Err(source) = self.store.persist_attempt(attempt).await {
            tracing::warn!(attempt_id = %attempt.id, "persisting attempt failed: {source:#}");
            return Err(EngineError::PersistenceFailure {
                attempt_id: attempt.id,
                source,
            });
        }

        tracing::info!(attempt_id = %attempt.id, store = self.store.name(), "attempt persisted");
        session.mark_persisted();
        Ok(())
    }

    /// Persist the completed attempt, then return its filtered review.
    pub async fn finalize(&self, session: &mut AttemptSession) -> EngineResult<AssessmentResult> {
        self.persist(session).await?;
        session.review()
    }

    /// Apply a human grader's points to a stored attempt and save it again.
    pub async fn record_manual_grades(
        &self,
        user_id: &str,
        subject_id: &str,
        attempt_id: Uuid,
        grades: &BTreeMap<QuestionId, u32>,
    ) -> Result<Attempt> {
        let config = self
            .store
            .load_question_set(subject_id)
            .await
            .with_context(|| format!("failed to load question set '{subject_id}'"))?;

        let mut attempt = self
            .store
            .load_prior_attempts(user_id, subject_id)
            .await?
            .into_iter()
            .find(|a| a.id == attempt_id)
            .with_context(|| format!("attempt {attempt_id} not found"))?;

        anyhow::ensure!(
            attempt.is_completed(),
            "attempt {attempt_id} has not been submitted"
        );

        grading::record_manual_grades(&mut attempt, &config, grades)?;

        self.store
            .persist_attempt(&attempt)
            .await
            .map_err(|source| EngineError::PersistenceFailure {
                attempt_id,
                source,
            })?;

        Ok(attempt)
    }
}
