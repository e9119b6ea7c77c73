//! Core data model types for the final exam.
//!
//! Records here are serialized in camelCase, the shape the UI layer persists
//! and reads back.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExamError;

/// Certificate tier a study plan targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateLevel {
    Basico,
    Intermediario,
    Avancado,
}

impl CertificateLevel {
    pub const ALL: [CertificateLevel; 3] = [
        CertificateLevel::Basico,
        CertificateLevel::Intermediario,
        CertificateLevel::Avancado,
    ];

    /// Map a study profile's target level onto a certificate level.
    ///
    /// Unknown values fall back to `Basico`.
    pub fn from_target_level(target_level: &str) -> Self {
        match target_level.trim().to_lowercase().as_str() {
            "intermediate" => CertificateLevel::Intermediario,
            "advanced" | "expert" => CertificateLevel::Avancado,
            _ => CertificateLevel::Basico,
        }
    }
}

impl fmt::Display for CertificateLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateLevel::Basico => write!(f, "basico"),
            CertificateLevel::Intermediario => write!(f, "intermediario"),
            CertificateLevel::Avancado => write!(f, "avancado"),
        }
    }
}

impl FromStr for CertificateLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basico" => Ok(CertificateLevel::Basico),
            "intermediario" => Ok(CertificateLevel::Intermediario),
            "avancado" => Ok(CertificateLevel::Avancado),
            other => Err(format!("unknown certificate level: {other}")),
        }
    }
}

/// How a question is answered and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    MultipleSelect,
    TrueFalse,
    FillBlank,
    CodeOutput,
}

impl QuestionType {
    /// Whether the question presents a fixed list of options.
    pub fn has_options(self) -> bool {
        !matches!(self, QuestionType::FillBlank)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::MultipleSelect => "multiple_select",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillBlank => "fill_blank",
            QuestionType::CodeOutput => "code_output",
        };
        f.write_str(s)
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "multiple_select" => Ok(QuestionType::MultipleSelect),
            "true_false" => Ok(QuestionType::TrueFalse),
            "fill_blank" => Ok(QuestionType::FillBlank),
            "code_output" => Ok(QuestionType::CodeOutput),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Target share of each difficulty in a drawn attempt, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyDistribution {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

/// Immutable exam parameters for one certificate level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalExamConfig {
    pub level: CertificateLevel,
    /// Pool size requested from the generator.
    pub total_questions: u32,
    pub questions_per_attempt: u32,
    /// Minimum score (0-100) for an attempt to pass.
    pub passing_score: u32,
    pub max_time_minutes: u32,
    /// Seconds a question must be on screen before it can be confirmed.
    pub min_time_per_question: u32,
    /// Seconds after which a question auto-confirms.
    pub max_time_per_question: u32,
    pub retry_wait_hours: u32,
    pub difficulty_distribution: DifficultyDistribution,
}

impl FinalExamConfig {
    /// Global time limit for one attempt.
    pub fn max_time_secs(&self) -> i64 {
        i64::from(self.max_time_minutes) * 60
    }

    pub fn validate(&self) -> Result<(), ExamError> {
        let d = self.difficulty_distribution;
        if d.easy + d.medium + d.hard != 100 {
            return Err(ExamError::InvalidConfig(format!(
                "difficulty distribution must sum to 100, got {}",
                d.easy + d.medium + d.hard
            )));
        }
        if self.passing_score > 100 {
            return Err(ExamError::InvalidConfig(format!(
                "passing score {} exceeds 100",
                self.passing_score
            )));
        }
        if self.questions_per_attempt == 0 {
            return Err(ExamError::InvalidConfig(
                "questions per attempt must be at least 1".into(),
            ));
        }
        if self.total_questions < self.questions_per_attempt {
            return Err(ExamError::InvalidConfig(format!(
                "pool size {} is smaller than questions per attempt {}",
                self.total_questions, self.questions_per_attempt
            )));
        }
        if self.min_time_per_question > self.max_time_per_question {
            return Err(ExamError::InvalidConfig(format!(
                "min time per question ({}s) exceeds max ({}s)",
                self.min_time_per_question, self.max_time_per_question
            )));
        }
        if self.max_time_minutes == 0 {
            return Err(ExamError::InvalidConfig(
                "max time must be at least 1 minute".into(),
            ));
        }
        Ok(())
    }
}

/// One generated exam question. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalExamQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    /// Absent for `fill_blank`.
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Expected answer for every type except `multiple_select`.
    #[serde(default)]
    pub correct_answer: Option<String>,
    /// Expected answer set for `multiple_select`.
    #[serde(default)]
    pub correct_answers: Option<Vec<String>>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub code_context: Option<String>,
    /// Lesson topic this question covers.
    #[serde(default)]
    pub topic: String,
    pub min_time_seconds: u32,
    pub max_time_seconds: u32,
}

impl FinalExamQuestion {
    /// Whether the question carries everything needed to score an answer.
    pub fn is_scorable(&self) -> bool {
        if self.question.trim().is_empty() {
            return false;
        }
        if self.question_type.has_options()
            && self.options.as_ref().map_or(true, |o| o.is_empty())
        {
            return false;
        }
        match self.question_type {
            QuestionType::MultipleSelect => self
                .correct_answers
                .as_ref()
                .is_some_and(|answers| !answers.is_empty()),
            _ => self
                .correct_answer
                .as_ref()
                .is_some_and(|answer| !answer.trim().is_empty()),
        }
    }
}

/// An in-flight, not yet confirmed, selection for the current question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Response {
    /// A single option (multiple choice, true/false, code output).
    Choice(String),
    /// Every ticked option of a multiple-select question.
    Selection(BTreeSet<String>),
    /// Free text for a fill-in-the-blank question.
    Text(String),
}

impl Response {
    pub fn is_blank(&self) -> bool {
        match self {
            Response::Choice(s) => s.is_empty(),
            Response::Selection(set) => set.is_empty(),
            Response::Text(s) => s.trim().is_empty(),
        }
    }
}

/// A confirmed answer. `is_correct` is computed once, at confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalExamAnswer {
    pub question_id: String,
    /// Submitted answer; multi-select answers are joined with `", "`.
    pub answer: String,
    /// Submitted set for multi-select questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
    pub time_spent_seconds: u32,
    pub is_correct: bool,
}

/// One recorded pass through a drawn question subset. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalExamAttempt {
    pub id: Uuid,
    /// 1-based, monotonic within an exam.
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// 0-100.
    pub score: u32,
    pub passed: bool,
    /// One entry per drawn question, in presentation order.
    pub answers: Vec<FinalExamAnswer>,
    pub questions_used: Vec<String>,
    pub total_time_seconds: u32,
    /// Times the exam surface lost visibility. Recorded, never enforced.
    pub tab_away_count: u32,
}

impl FinalExamAttempt {
    pub fn correct_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_correct).count()
    }
}

/// A generated final exam and its attempt history.
///
/// `attempts` is append-only, `best_score` never decreases and `is_passed`
/// never reverts once set; all three are only reachable through
/// [`FinalExam::record_attempt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalExam {
    pub id: Uuid,
    pub plan_id: String,
    pub config: FinalExamConfig,
    pub question_pool: Vec<FinalExamQuestion>,
    attempts: Vec<FinalExamAttempt>,
    best_score: Option<u32>,
    is_passed: bool,
    passed_at: Option<DateTime<Utc>>,
    last_attempt_at: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
}

impl FinalExam {
    pub fn new(
        plan_id: impl Into<String>,
        config: FinalExamConfig,
        question_pool: Vec<FinalExamQuestion>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            plan_id: plan_id.into(),
            config,
            question_pool,
            attempts: Vec::new(),
            best_score: None,
            is_passed: false,
            passed_at: None,
            last_attempt_at: None,
            generated_at,
        }
    }

    pub fn attempts(&self) -> &[FinalExamAttempt] {
        &self.attempts
    }

    pub fn best_score(&self) -> Option<u32> {
        self.best_score
    }

    pub fn is_passed(&self) -> bool {
        self.is_passed
    }

    pub fn passed_at(&self) -> Option<DateTime<Utc>> {
        self.passed_at
    }

    pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_at
    }

    pub fn next_attempt_number(&self) -> u32 {
        self.attempts.len() as u32 + 1
    }

    /// Append a finished attempt and fold it into the exam's summary fields.
    ///
    /// Returns `true` when this attempt is the first passing one. Attempts
    /// scoring above 100, or whose `passed` flag disagrees with the passing
    /// score, are refused.
    pub fn record_attempt(&mut self, attempt: FinalExamAttempt) -> Result<bool, ExamError> {
        if self.is_passed {
            return Err(ExamError::AlreadyPassed);
        }
        let expected = self.next_attempt_number();
        if attempt.attempt_number != expected {
            return Err(ExamError::AttemptOutOfSequence {
                expected,
                got: attempt.attempt_number,
            });
        }
        if attempt.score > 100 || attempt.passed != (attempt.score >= self.config.passing_score) {
            return Err(ExamError::InconsistentAttempt {
                attempt: attempt.attempt_number,
                score: attempt.score,
                passed: attempt.passed,
                passing_score: self.config.passing_score,
            });
        }

        self.best_score = Some(self.best_score.map_or(attempt.score, |b| b.max(attempt.score)));
        self.last_attempt_at = Some(attempt.completed_at);
        let newly_passed = attempt.passed;
        if newly_passed {
            self.is_passed = true;
            self.passed_at = Some(attempt.completed_at);
        }

        tracing::info!(
            exam_id = %self.id,
            attempt = attempt.attempt_number,
            score = attempt.score,
            passed = attempt.passed,
            "recorded final exam attempt"
        );
        self.attempts.push(attempt);
        Ok(newly_passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::exam_config;

    fn attempt(number: u32, score: u32, passed: bool) -> FinalExamAttempt {
        let at = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + chrono::Duration::days(i64::from(number));
        FinalExamAttempt {
            id: Uuid::new_v4(),
            attempt_number: number,
            started_at: at,
            completed_at: at,
            score,
            passed,
            answers: vec![],
            questions_used: vec![],
            total_time_seconds: 0,
            tab_away_count: 0,
        }
    }

    #[test]
    fn level_display_and_parse() {
        assert_eq!(CertificateLevel::Intermediario.to_string(), "intermediario");
        assert_eq!(
            "AVANCADO".parse::<CertificateLevel>().unwrap(),
            CertificateLevel::Avancado
        );
        assert!("expert".parse::<CertificateLevel>().is_err());
    }

    #[test]
    fn target_level_mapping() {
        assert_eq!(
            CertificateLevel::from_target_level("basic"),
            CertificateLevel::Basico
        );
        assert_eq!(
            CertificateLevel::from_target_level("intermediate"),
            CertificateLevel::Intermediario
        );
        assert_eq!(
            CertificateLevel::from_target_level("expert"),
            CertificateLevel::Avancado
        );
        assert_eq!(
            CertificateLevel::from_target_level("whatever"),
            CertificateLevel::Basico
        );
    }

    #[test]
    fn question_type_serde_names() {
        let json = serde_json::to_string(&QuestionType::MultipleSelect).unwrap();
        assert_eq!(json, "\"multiple_select\"");
        assert_eq!(
            "fill_blank".parse::<QuestionType>().unwrap(),
            QuestionType::FillBlank
        );
    }

    #[test]
    fn best_score_and_pass_are_monotonic() {
        let mut exam =
            FinalExam::new("plan-1", exam_config(CertificateLevel::Basico), vec![], Utc::now());

        assert!(!exam.record_attempt(attempt(1, 60, false)).unwrap());
        assert_eq!(exam.best_score(), Some(60));
        assert!(!exam.record_attempt(attempt(2, 40, false)).unwrap());
        assert_eq!(exam.best_score(), Some(60), "best score must not decrease");
        assert!(exam.record_attempt(attempt(3, 87, true)).unwrap());
        assert!(exam.is_passed());
        assert_eq!(exam.best_score(), Some(87));
        assert_eq!(exam.passed_at(), Some(exam.attempts()[2].completed_at));
        assert_eq!(exam.last_attempt_at(), Some(exam.attempts()[2].completed_at));

        let err = exam.record_attempt(attempt(4, 100, true)).unwrap_err();
        assert!(matches!(err, ExamError::AlreadyPassed));
        assert!(exam.is_passed());
        assert_eq!(exam.attempts().len(), 3);
    }

    #[test]
    fn out_of_sequence_attempt_is_rejected() {
        let mut exam =
            FinalExam::new("plan-1", exam_config(CertificateLevel::Basico), vec![], Utc::now());
        exam.record_attempt(attempt(1, 10, false)).unwrap();
        let err = exam.record_attempt(attempt(1, 20, false)).unwrap_err();
        assert!(matches!(
            err,
            ExamError::AttemptOutOfSequence {
                expected: 2,
                got: 1
            }
        ));
        assert_eq!(exam.attempts().len(), 1);
    }

    #[test]
    fn inconsistent_attempt_is_rejected() {
        let mut exam =
            FinalExam::new("plan-1", exam_config(CertificateLevel::Basico), vec![], Utc::now());
        let err = exam.record_attempt(attempt(1, 150, false)).unwrap_err();
        assert!(matches!(
            err,
            ExamError::InconsistentAttempt {
                score: 150,
                passing_score: 80,
                ..
            }
        ));
        assert!(matches!(
            exam.record_attempt(attempt(1, 79, true)),
            Err(ExamError::InconsistentAttempt { .. })
        ));
        assert!(matches!(
            exam.record_attempt(attempt(1, 80, false)),
            Err(ExamError::InconsistentAttempt { .. })
        ));
        assert!(exam.attempts().is_empty());
        assert_eq!(exam.best_score(), None);

        assert!(exam.record_attempt(attempt(1, 80, true)).unwrap());
        assert_eq!(exam.best_score(), Some(80));
    }

    #[test]
    fn config_validation() {
        let mut config = exam_config(CertificateLevel::Avancado);
        assert!(config.validate().is_ok());
        config.difficulty_distribution.hard = 10;
        assert!(config.validate().is_err());

        let mut config = exam_config(CertificateLevel::Basico);
        config.min_time_per_question = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn scorable_question_rules() {
        let mut q = FinalExamQuestion {
            id: "q1".into(),
            question: "Pick all primes".into(),
            question_type: QuestionType::MultipleSelect,
            difficulty: Difficulty::Hard,
            options: Some(vec!["2".into(), "3".into(), "4".into()]),
            correct_answer: None,
            correct_answers: Some(vec![]),
            explanation: String::new(),
            code_context: None,
            topic: "numbers".into(),
            min_time_seconds: 15,
            max_time_seconds: 120,
        };
        assert!(!q.is_scorable());
        q.correct_answers = Some(vec!["2".into(), "3".into()]);
        assert!(q.is_scorable());

        q.question_type = QuestionType::FillBlank;
        q.options = None;
        q.correct_answer = Some("  ".into());
        assert!(!q.is_scorable());
    }

    #[test]
    fn exam_serde_uses_camel_case() {
        let exam =
            FinalExam::new("plan-9", exam_config(CertificateLevel::Basico), vec![], Utc::now());
        let json = serde_json::to_value(&exam).unwrap();
        assert_eq!(json["planId"], "plan-9");
        assert_eq!(json["isPassed"], false);
        assert_eq!(json["config"]["questionsPerAttempt"], 15);
        let back: FinalExam = serde_json::from_value(json).unwrap();
        assert_eq!(back, exam);
    }
}
