//! File-backed store rooted at a data directory.
//!
//! Layout:
//!
//! ```text
//! <data_dir>/assessments/<subject_id>.toml
//! <data_dir>/attempts/<user_id>/<subject_id>/<attempt_id>.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use assessor_core::model::{AssessmentConfig, Attempt};
use assessor_core::parser::{load_assessment_directory, parse_assessment, parse_assessment_str};
use assessor_core::traits::AssessmentStore;

use crate::error::StoreError;

/// An `AssessmentStore` that reads TOML question sets and writes attempts as
/// pretty-printed JSON.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn assessments_dir(&self) -> PathBuf {
        self.root.join("assessments")
    }

    fn attempts_dir(&self, user_id: &str, subject_id: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join("attempts")
            .join(safe_component(user_id)?)
            .join(safe_component(subject_id)?))
    }

    /// Copy an authored assessment into the store so it can be loaded by id.
    ///
    /// Returns the parsed configuration.
    pub async fn install_assessment(&self, source: &Path) -> Result<AssessmentConfig> {
        let config = parse_assessment(source)?;
        let dir = self.assessments_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| io_error(&dir, source))?;

        let target = dir.join(format!("{}.toml", safe_component(&config.id)?));
        if target != source {
            tokio::fs::copy(source, &target)
                .await
                .map_err(|source| io_error(&target, source))?;
        }
        tracing::debug!(subject_id = %config.id, path = %target.display(), "assessment installed");
        Ok(config)
    }
}

/// Reject ids that would escape their directory.
fn safe_component(id: &str) -> Result<&str> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        anyhow::bail!("invalid identifier for file store: {id:?}");
    }
    Ok(id)
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl AssessmentStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load_question_set(&self, subject_id: &str) -> Result<AssessmentConfig> {
        let path = self
            .assessments_dir()
            .join(format!("{}.toml", safe_component(subject_id)?));

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let config = parse_assessment_str(&content, &path)?;
                if config.id == subject_id {
                    return Ok(config);
                }
                tracing::warn!(
                    subject_id,
                    declared_id = %config.id,
                    path = %path.display(),
                    "assessment file declares a different id"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&path, e).into()),
        }

        // Fall back to any file in the directory declaring this id.
        let dir = self.assessments_dir();
        if !dir.is_dir() {
            return Err(StoreError::not_found("question set", subject_id).into());
        }
        let configs = tokio::task::spawn_blocking(move || load_assessment_directory(&dir))
            .await
            .context("assessment scan task failed")??;

        configs
            .into_iter()
            .find(|c| c.id == subject_id)
            .ok_or_else(|| StoreError::not_found("question set", subject_id).into())
    }

    async fn load_prior_attempts(&self, user_id: &str, subject_id: &str) -> Result<Vec<Attempt>> {
        let dir = self.attempts_dir(user_id, subject_id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir, e).into()),
        };

        let mut attempts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| io_error(&dir, source))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| io_error(&path, source))?;
            let attempt: Attempt =
                serde_json::from_str(&content).map_err(|e| StoreError::Parse {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            attempts.push(attempt);
        }

        attempts.sort_by_key(|a| a.started_at);
        Ok(attempts)
    }

    async fn persist_attempt(&self, attempt: &Attempt) -> Result<()> {
        let dir = self.attempts_dir(&attempt.user_id, &attempt.subject_id)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| io_error(&dir, source))?;

        let path = dir.join(format!("{}.json", attempt.id));
        let json = serde_json::to_string_pretty(attempt)?;

        // Write then rename so a crash never leaves a truncated attempt.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| io_error(&tmp, source))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| io_error(&path, source))?;

        tracing::debug!(attempt_id = %attempt.id, path = %path.display(), "attempt written");
        Ok(())
    }
}
