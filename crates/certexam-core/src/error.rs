//! Error types for the exam engine.
//!
//! `GenerationError` lives here rather than in `certexam-providers` so the
//! engine can downcast generator failures and decide whether to retry
//! without string matching.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by exam construction, attempt bookkeeping, and gating.
#[derive(Debug, Error)]
pub enum ExamError {
    /// A `FinalExamConfig` violates its own constraints.
    #[error("invalid exam config: {0}")]
    InvalidConfig(String),

    /// The question pool cannot fill an attempt.
    #[error("question pool has {available} usable questions, {required} required")]
    InsufficientPool { available: usize, required: usize },

    /// An attempt was recorded with the wrong attempt number.
    #[error("attempt {got} recorded out of sequence, expected {expected}")]
    AttemptOutOfSequence { expected: u32, got: u32 },

    /// An attempt's score or pass flag contradicts the exam's config.
    #[error(
        "attempt {attempt} is inconsistent: score {score}, passed {passed}, \
         passing score {passing_score}"
    )]
    InconsistentAttempt {
        attempt: u32,
        score: u32,
        passed: bool,
        passing_score: u32,
    },

    /// The exam has already been passed; no further attempts are accepted.
    #[error("final exam already passed")]
    AlreadyPassed,

    /// A retake was requested before the cooldown elapsed.
    #[error("retake not allowed until {wait_until}")]
    CooldownActive { wait_until: DateTime<Utc> },

    /// Lessons, exercises, or quizzes are still outstanding.
    #[error("exam prerequisites not met: {}", .0.join("; "))]
    PrerequisitesUnmet(Vec<String>),

    /// The question-pool generator failed. Recoverable: no exam state was created.
    #[error("question pool generation failed: {0}")]
    Generation(String),
}

impl ExamError {
    /// Returns `true` if the caller can reasonably offer a "try again" action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExamError::Generation(_)
                | ExamError::InsufficientPool { .. }
                | ExamError::CooldownActive { .. }
        )
    }
}

/// Errors that can occur while generating a question pool.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The completion backend could not be reached or returned an error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend asked us to slow down.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The response could not be parsed into questions.
    #[error("malformed generation response: {0}")]
    Malformed(String),

    /// Generation succeeded but produced too few usable questions.
    #[error("generated {available} usable questions, {required} required")]
    InsufficientPool { available: usize, required: usize },

    /// The backend refused the request outright (bad credentials, content policy).
    #[error("generation rejected: {0}")]
    Rejected(String),
}

impl GenerationError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(self, GenerationError::Rejected(_))
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            GenerationError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Reasons a diploma cannot be issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IssueError {
    #[error("legal disclaimer must be acknowledged before issuing a diploma")]
    DisclaimerNotAcknowledged,

    #[error("final exam has not been passed")]
    ExamNotPassed,

    #[error("no study plan loaded")]
    MissingPlan,

    #[error("no student profile loaded")]
    MissingProfile,
}
