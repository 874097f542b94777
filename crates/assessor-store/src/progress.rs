//! Prerequisite gate driven by lecture progress.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;

use assessor_core::traits::PrerequisiteGate;

/// Default share of the lecture a learner must have watched.
pub const DEFAULT_THRESHOLD_PERCENT: u32 = 90;

/// Opens the gate once a learner has watched at least `threshold_percent`
/// of the material for a subject.
///
/// Progress can be recorded directly or loaded from a JSON document shaped
/// `{ "<learner>": { "<subject>": <percent> } }`.
pub struct ProgressGate {
    threshold_percent: u32,
    watched: Mutex<HashMap<(String, String), u32>>,
}

impl ProgressGate {
    pub fn new(threshold_percent: u32) -> Self {
        Self {
            threshold_percent: threshold_percent.min(100),
            watched: Mutex::new(HashMap::new()),
        }
    }

    pub fn threshold_percent(&self) -> u32 {
        self.threshold_percent
    }

    /// Load recorded progress from `path`. A missing file means no progress.
    pub fn load(path: &Path, threshold_percent: u32) -> Result<Self> {
        let gate = Self::new(threshold_percent);
        if !path.exists() {
            return Ok(gate);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read progress file: {}", path.display()))?;
        let doc: HashMap<String, HashMap<String, u32>> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse progress file: {}", path.display()))?;

        for (learner, subjects) in doc {
            for (subject, percent) in subjects {
                gate.record_progress(&learner, &subject, percent);
            }
        }
        Ok(gate)
    }

    /// Record how much of `subject_id` the learner has watched. Progress
    /// never goes backwards.
    pub fn record_progress(&self, learner_id: &str, subject_id: &str, percent: u32) {
        let mut watched = self.watched.lock().unwrap_or_else(|e| e.into_inner());
        let entry = watched
            .entry((learner_id.to_string(), subject_id.to_string()))
            .or_insert(0);
        *entry = (*entry).max(percent.min(100));
    }

    pub fn watched_percent(&self, learner_id: &str, subject_id: &str) -> u32 {
        let watched = self.watched.lock().unwrap_or_else(|e| e.into_inner());
        watched
            .get(&(learner_id.to_string(), subject_id.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl Default for ProgressGate {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_PERCENT)
    }
}

#[async_trait]
impl PrerequisiteGate for ProgressGate {
    async fn is_prerequisite_satisfied(&self, learner_id: &str, subject_id: &str) -> Result<bool> {
        let watched = self.watched_percent(learner_id, subject_id);
        let satisfied = watched >= self.threshold_percent;
        tracing::debug!(
            learner_id,
            subject_id,
            watched,
            threshold = self.threshold_percent,
            satisfied,
            "prerequisite checked"
        );
        Ok(satisfied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let gate = ProgressGate::default();
        gate.record_progress("u1", "quiz-1", 89);
        assert!(!gate.is_prerequisite_satisfied("u1", "quiz-1").await.unwrap());
        gate.record_progress("u1", "quiz-1", 90);
        assert!(gate.is_prerequisite_satisfied("u1", "quiz-1").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_learner_is_closed() {
        let gate = ProgressGate::default();
        assert!(!gate.is_prerequisite_satisfied("nobody", "quiz-1").await.unwrap());
    }

    #[test]
    fn progress_never_decreases() {
        let gate = ProgressGate::default();
        gate.record_progress("u1", "quiz-1", 95);
        gate.record_progress("u1", "quiz-1", 10);
        assert_eq!(gate.watched_percent("u1", "quiz-1"), 95);
    }

    #[test]
    fn load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, r#"{"u1": {"quiz-1": 100, "quiz-2": 40}}"#).unwrap();

        let gate = ProgressGate::load(&path, 50).unwrap();
        assert_eq!(gate.threshold_percent(), 50);
        assert_eq!(gate.watched_percent("u1", "quiz-1"), 100);
        assert_eq!(gate.watched_percent("u1", "quiz-2"), 40);
    }

    #[test]
    fn missing_file_means_no_progress() {
        let dir = tempfile::tempdir().unwrap();
        let gate = ProgressGate::load(&dir.path().join("absent.json"), 90).unwrap();
        assert_eq!(gate.watched_percent("u1", "quiz-1"), 0);
    }
}
