//! Answer correctness and attempt scoring.
//!
//! Correctness is decided once, when an answer is confirmed, and stored on
//! the [`FinalExamAnswer`]. The attempt score is then a fold over those
//! stored verdicts; nothing is re-derived from UI state afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{FinalExamAnswer, FinalExamQuestion, QuestionType, Response};

/// Whether `response` answers `question` correctly.
///
/// - choice types: exact string match against `correctAnswer`
/// - `multiple_select`: exact set equality with `correctAnswers`, no partial credit
/// - `fill_blank`: case-insensitive match after trimming whitespace
///
/// A missing response, or one of the wrong shape for the question type, is
/// incorrect.
pub fn is_correct(question: &FinalExamQuestion, response: Option<&Response>) -> bool {
    let Some(response) = response else {
        return false;
    };
    match (question.question_type, response) {
        (
            QuestionType::MultipleChoice | QuestionType::TrueFalse | QuestionType::CodeOutput,
            Response::Choice(choice),
        ) => question.correct_answer.as_deref() == Some(choice.as_str()),
        (QuestionType::MultipleSelect, Response::Selection(selected)) => {
            let Some(expected) = &question.correct_answers else {
                return false;
            };
            let expected: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
            let selected: BTreeSet<&str> = selected.iter().map(String::as_str).collect();
            !expected.is_empty() && expected == selected
        }
        (QuestionType::FillBlank, Response::Text(text)) => {
            let given = text.trim();
            match question.correct_answer.as_deref() {
                Some(expected) => {
                    !given.is_empty() && given.to_lowercase() == expected.trim().to_lowercase()
                }
                None => false,
            }
        }
        _ => false,
    }
}

/// Build the immutable answer record for a confirmed question.
pub fn evaluate(
    question: &FinalExamQuestion,
    response: Option<&Response>,
    time_spent_seconds: u32,
) -> FinalExamAnswer {
    let is_correct = is_correct(question, response);
    let (answer, answers) = match response {
        None => (String::new(), None),
        Some(Response::Choice(choice)) => (choice.clone(), None),
        Some(Response::Text(text)) => (text.trim().to_string(), None),
        Some(Response::Selection(set)) => {
            let list: Vec<String> = set.iter().cloned().collect();
            (list.join(", "), Some(list))
        }
    };
    FinalExamAnswer {
        question_id: question.id.clone(),
        answer,
        answers,
        time_spent_seconds,
        is_correct,
    }
}

/// `round(100 * correct / total)`, rounding halves up. Zero questions score 0.
pub fn score_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u64;
    let total = total as u64;
    ((200 * correct + total) / (2 * total)) as u32
}

/// Result of folding an attempt's answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    pub correct: usize,
    pub total: usize,
    pub score: u32,
    pub passed: bool,
}

/// Score a list of confirmed answers against the number of drawn questions.
///
/// Questions without an answer count as incorrect.
pub fn score_answers(
    answers: &[FinalExamAnswer],
    total_questions: usize,
    passing_score: u32,
) -> ScoreCard {
    let correct = answers.iter().filter(|a| a.is_correct).count();
    let score = score_percent(correct, total_questions);
    ScoreCard {
        correct,
        total: total_questions,
        score,
        passed: score >= passing_score,
    }
}
