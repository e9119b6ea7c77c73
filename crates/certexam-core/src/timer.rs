//! Attempt-wide and per-question timers.
//!
//! Both timers are passive: they hold a start instant and are sampled with a
//! caller-supplied `now`. Expiry is reported through one-shot `poll` methods
//! so repeated ticks past the deadline fire at most once. A timeout is
//! detected on the first sample at or after the deadline, so it is never
//! late by more than the sampling interval.

use chrono::{DateTime, Utc};

fn whole_secs_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().max(0)
}

/// Global countdown for a whole attempt.
#[derive(Debug, Clone)]
pub struct ExamTimer {
    started_at: DateTime<Utc>,
    limit_secs: i64,
    fired: bool,
}

impl ExamTimer {
    pub fn new(started_at: DateTime<Utc>, limit_secs: i64) -> Self {
        Self {
            started_at,
            limit_secs,
            fired: false,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        whole_secs_between(self.started_at, now)
    }

    /// Seconds left, clamped at zero.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.limit_secs - self.elapsed_secs(now)).max(0)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_secs(now) >= self.limit_secs
    }

    /// Returns `true` exactly once: on the first call at or past the limit.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        if self.fired || !self.is_expired(now) {
            return false;
        }
        self.fired = true;
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

/// Dwell-time tracker for the question currently on screen.
#[derive(Debug, Clone)]
pub struct QuestionTimer {
    started_at: DateTime<Utc>,
    min_secs: u32,
    max_secs: u32,
    fired: bool,
}

impl QuestionTimer {
    pub fn new(started_at: DateTime<Utc>, min_secs: u32, max_secs: u32) -> Self {
        Self {
            started_at,
            min_secs,
            max_secs,
            fired: false,
        }
    }

    /// Start timing a newly presented question.
    pub fn restart(&mut self, now: DateTime<Utc>, min_secs: u32, max_secs: u32) {
        *self = Self::new(now, min_secs, max_secs);
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u32 {
        u32::try_from(whole_secs_between(self.started_at, now)).unwrap_or(u32::MAX)
    }

    /// Gate on confirmation: the question has been on screen long enough.
    pub fn min_time_met(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_secs(now) >= self.min_secs
    }

    /// Countdown shown on the disabled confirm control.
    pub fn secs_until_unlock(&self, now: DateTime<Utc>) -> u32 {
        self.min_secs.saturating_sub(self.elapsed_secs(now))
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u32 {
        self.max_secs.saturating_sub(self.elapsed_secs(now))
    }

    /// Returns `true` exactly once: on the first call at or past `max_secs`.
    pub fn poll_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.fired || self.elapsed_secs(now) < self.max_secs {
            return false;
        }
        self.fired = true;
        true
    }
}
