//! Attempt and exam statistics for progress views and integrity review.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, FinalExam, FinalExamAttempt, FinalExamQuestion};

/// Correct/total tally for one bucket of answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub correct: u32,
    pub total: u32,
}

impl Tally {
    fn add(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Fraction correct in `[0, 1]`; 0 for an empty bucket.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.total)
        }
    }
}

/// Per-topic and per-difficulty view of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptBreakdown {
    pub by_topic: BTreeMap<String, Tally>,
    pub by_difficulty: BTreeMap<Difficulty, Tally>,
    /// Mean seconds per answered question.
    pub average_time_seconds: f64,
    /// Answers recorded blank: timed out or never reached.
    pub blank_answers: u32,
}

/// Break an attempt down using the questions it drew.
///
/// Answers whose question is not in `questions` count under the
/// `"unknown"` topic and are left out of the difficulty buckets.
pub fn attempt_breakdown(
    attempt: &FinalExamAttempt,
    questions: &[FinalExamQuestion],
) -> AttemptBreakdown {
    let by_id: HashMap<&str, &FinalExamQuestion> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();

    let mut by_topic: BTreeMap<String, Tally> = BTreeMap::new();
    let mut by_difficulty: BTreeMap<Difficulty, Tally> = BTreeMap::new();
    let mut blank_answers = 0;
    let mut answered_time = 0u64;
    let mut answered = 0u32;

    for answer in &attempt.answers {
        let question = by_id.get(answer.question_id.as_str());
        let topic = question
            .map(|q| q.topic.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or("unknown");
        by_topic.entry(topic.to_string()).or_default().add(answer.is_correct);
        if let Some(q) = question {
            by_difficulty.entry(q.difficulty).or_default().add(answer.is_correct);
        }
        if answer.answer.trim().is_empty() {
            blank_answers += 1;
        } else {
            answered += 1;
            answered_time += u64::from(answer.time_spent_seconds);
        }
    }

    AttemptBreakdown {
        by_topic,
        by_difficulty,
        average_time_seconds: if answered == 0 {
            0.0
        } else {
            answered_time as f64 / f64::from(answered)
        },
        blank_answers,
    }
}

/// Summary across every attempt at an exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub attempts: u32,
    pub best_score: Option<u32>,
    pub average_score: f64,
    /// Share of attempts that passed, in `[0, 1]`.
    pub pass_rate: f64,
    pub is_passed: bool,
    pub total_tab_away: u32,
    pub total_time_seconds: u64,
}

pub fn exam_summary(exam: &FinalExam) -> ExamSummary {
    let attempts = exam.attempts();
    let n = attempts.len() as u32;
    let (score_sum, passes, tab_away, time) = attempts.iter().fold(
        (0u64, 0u32, 0u32, 0u64),
        |(s, p, t, secs), a| {
            (
                s + u64::from(a.score),
                p + u32::from(a.passed),
                t + a.tab_away_count,
                secs + u64::from(a.total_time_seconds),
            )
        },
    );
    let (average_score, pass_rate) = if n == 0 {
        (0.0, 0.0)
    } else {
        (score_sum as f64 / f64::from(n), f64::from(passes) / f64::from(n))
    };
    ExamSummary {
        attempts: n,
        best_score: exam.best_score(),
        average_score,
        pass_rate,
        is_passed: exam.is_passed(),
        total_tab_away: tab_away,
        total_time_seconds: time,
    }
}
