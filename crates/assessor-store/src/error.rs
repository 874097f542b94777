//! Store error types.

use thiserror::Error;

/// Errors raised by the storage backends.
///
/// They travel through the collaborator traits inside `anyhow::Error`;
/// callers can `downcast_ref::<StoreError>()` to tell them apart.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No question set or attempt exists under the requested id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Reading or writing the backing files failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored document could not be decoded.
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// The store refused the operation (used for injected failures).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether retrying the same call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Io { .. } | StoreError::Unavailable(_))
    }
}
