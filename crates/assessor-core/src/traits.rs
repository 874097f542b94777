//! Collaborator traits the engine depends on.
//!
//! These async traits are implemented by the `assessor-store` crate. The
//! engine never persists or loads anything on its own.

use async_trait::async_trait;

use crate::model::{AssessmentConfig, Attempt};

// ---------------------------------------------------------------------------
// Assessment store
// ---------------------------------------------------------------------------

/// Source of question sets and sink for completed attempts.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Human-readable store name (e.g. "memory").
    fn name(&self) -> &str;

    /// Load the question set and configuration for a subject.
    async fn load_question_set(&self, subject_id: &str) -> anyhow::Result<AssessmentConfig>;

    /// Load every stored attempt by `user_id` at `subject_id`.
    async fn load_prior_attempts(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> anyhow::Result<Vec<Attempt>>;

    /// Save a completed attempt. Saving the same attempt id twice overwrites.
    async fn persist_attempt(&self, attempt: &Attempt) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Prerequisite gate
// ---------------------------------------------------------------------------

/// External precondition consulted before an attempt may start.
#[async_trait]
pub trait PrerequisiteGate: Send + Sync {
    /// Whether `learner_id` has met the prerequisite for `subject_id`
    /// (e.g. watched enough of the lecture video).
    async fn is_prerequisite_satisfied(
        &self,
        learner_id: &str,
        subject_id: &str,
    ) -> anyhow::Result<bool>;
}

/// Gate that is always open.
pub struct NoPrerequisite;

#[async_trait]
impl PrerequisiteGate for NoPrerequisite {
    async fn is_prerequisite_satisfied(&self, _: &str, _: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}
