//! Retake cooldown policy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::FinalExam;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetakeStatus {
    pub can_retake: bool,
    /// Set only while a cooldown is running.
    pub wait_until: Option<DateTime<Utc>>,
}

impl RetakeStatus {
    const ALLOWED: Self = Self {
        can_retake: true,
        wait_until: None,
    };
}

/// Whether another attempt at `exam` may start at `now`.
///
/// A passed exam cannot be retaken. With no prior attempt the answer is
/// always yes; otherwise the student waits `retryWaitHours` after the last
/// attempt.
pub fn can_retake(exam: &FinalExam, now: DateTime<Utc>) -> RetakeStatus {
    if exam.is_passed() {
        return RetakeStatus {
            can_retake: false,
            wait_until: None,
        };
    }
    let Some(last) = exam.last_attempt_at() else {
        return RetakeStatus::ALLOWED;
    };
    let wait_until = last + Duration::hours(i64::from(exam.config.retry_wait_hours));
    if now < wait_until {
        RetakeStatus {
            can_retake: false,
            wait_until: Some(wait_until),
        }
    } else {
        RetakeStatus::ALLOWED
    }
}
