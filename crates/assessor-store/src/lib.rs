//! assessor-store: collaborator implementations for the assessment engine.
//!
//! Implements `AssessmentStore` in memory and on disk, the progress-based
//! `PrerequisiteGate`, and the `assessor.toml` configuration layer.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod progress;

pub use config::{load_config, load_config_from, AssessorConfig};
pub use error::StoreError;
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use progress::ProgressGate;
