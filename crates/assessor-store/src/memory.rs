//! In-memory store for tests and embedding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use assessor_core::model::{AssessmentConfig, Attempt};
use assessor_core::traits::AssessmentStore;

use crate::error::StoreError;

/// An `AssessmentStore` that keeps everything in process memory.
///
/// Counts persist calls and can be told to fail the next N of them, which
/// is how engine tests exercise the persistence-failure path.
#[derive(Default)]
pub struct InMemoryStore {
    configs: Mutex<HashMap<String, AssessmentConfig>>,
    attempts: Mutex<Vec<Attempt>>,
    persist_calls: AtomicU32,
    failures_pending: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with `configs`.
    pub fn with_configs(configs: impl IntoIterator<Item = AssessmentConfig>) -> Self {
        let store = Self::new();
        for config in configs {
            store.insert_config(config);
        }
        store
    }

    pub fn insert_config(&self, config: AssessmentConfig) {
        lock(&self.configs).insert(config.id.clone(), config);
    }

    /// Seed an attempt as if it had been persisted earlier.
    pub fn insert_attempt(&self, attempt: Attempt) {
        upsert(&mut lock(&self.attempts), attempt);
    }

    /// Make the next `n` calls to `persist_attempt` fail.
    pub fn fail_next_persists(&self, n: u32) {
        self.failures_pending.store(n, Ordering::SeqCst);
    }

    /// Number of `persist_attempt` calls, including failed ones.
    pub fn persist_calls(&self) -> u32 {
        self.persist_calls.load(Ordering::Relaxed)
    }

    /// Every saved attempt.
    pub fn attempts(&self) -> Vec<Attempt> {
        lock(&self.attempts).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn upsert(attempts: &mut Vec<Attempt>, attempt: Attempt) {
    match attempts.iter_mut().find(|a| a.id == attempt.id) {
        Some(existing) => *existing = attempt,
        None => attempts.push(attempt),
    }
}

#[async_trait]
impl AssessmentStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_question_set(&self, subject_id: &str) -> anyhow::Result<AssessmentConfig> {
        lock(&self.configs)
            .get(subject_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("question set", subject_id).into())
    }

    async fn load_prior_attempts(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> anyhow::Result<Vec<Attempt>> {
        Ok(lock(&self.attempts)
            .iter()
            .filter(|a| a.user_id == user_id && a.subject_id == subject_id)
            .cloned()
            .collect())
    }

    async fn persist_attempt(&self, attempt: &Attempt) -> anyhow::Result<()> {
        self.persist_calls.fetch_add(1, Ordering::Relaxed);

        let should_fail = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(StoreError::Unavailable("injected failure".into()).into());
        }

        upsert(&mut lock(&self.attempts), attempt.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn config(id: &str) -> AssessmentConfig {
        serde_json::from_str(&format!(r#"{{"id": "{id}"}}"#)).unwrap()
    }

    #[tokio::test]
    async fn loads_inserted_config() {
        let store = InMemoryStore::with_configs([config("quiz-1")]);
        let loaded = store.load_question_set("quiz-1").await.unwrap();
        assert_eq!(loaded.id, "quiz-1");
    }

    #[tokio::test]
    async fn missing_config_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.load_question_set("nope").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn persist_overwrites_by_id() {
        let store = InMemoryStore::new();
        let mut attempt = Attempt::new("quiz-1", "u1", Utc::now());
        store.persist_attempt(&attempt).await.unwrap();
        attempt.final_score_percent = Some(50);
        store.persist_attempt(&attempt).await.unwrap();

        let saved = store.load_prior_attempts("u1", "quiz-1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].final_score_percent, Some(50));
        assert_eq!(store.persist_calls(), 2);
    }

    #[tokio::test]
    async fn attempts_filtered_by_user_and_subject() {
        let store = InMemoryStore::new();
        store.insert_attempt(Attempt::new("quiz-1", "u1", Utc::now()));
        store.insert_attempt(Attempt::new("quiz-1", "u2", Utc::now()));
        store.insert_attempt(Attempt::new("quiz-2", "u1", Utc::now()));

        let saved = store.load_prior_attempts("u1", "quiz-1").await.unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_then_recovery() {
        let store = InMemoryStore::new();
        store.fail_next_persists(2);
        let attempt = Attempt::new("quiz-1", "u1", Utc::now());

        assert!(store.persist_attempt(&attempt).await.is_err());
        assert!(store.persist_attempt(&attempt).await.is_err());
        assert!(store.persist_attempt(&attempt).await.is_ok());
        assert_eq!(store.persist_calls(), 3);
        assert_eq!(store.attempts().len(), 1);
    }
}
