//! assessor-core: the assessment session engine.
//!
//! This crate runs timed quiz and assignment attempts: it captures answers,
//! enforces attempt, deadline and prerequisite policy, auto-grades
//! deterministic question kinds, applies late penalties, and decides which
//! feedback a learner may see.

pub mod answers;
pub mod clock;
pub mod countdown;
pub mod engine;
pub mod error;
pub mod grading;
pub mod model;
pub mod parser;
pub mod penalty;
pub mod policy;
pub mod session;
pub mod statistics;
pub mod ticker;
pub mod traits;
pub mod visibility;

pub use engine::AssessmentEngine;
pub use error::{DenialReason, EngineError, EngineResult};
pub use session::{AttemptSession, SessionState, SubmitOutcome, TickOutcome};
