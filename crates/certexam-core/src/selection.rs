//! Drawing an attempt's question subset from the pool.

use std::collections::HashSet;

use rand::Rng;

use crate::error::ExamError;
use crate::model::{Difficulty, FinalExam, FinalExamConfig, FinalExamQuestion};
use crate::shuffle::shuffle_in_place;

/// `round(n * pct / 100)`, halves rounded up.
fn share(n: usize, pct: u32) -> usize {
    (2 * n * pct as usize + 100) / 200
}

/// Per-difficulty quotas for an attempt of `count` questions.
///
/// Easy and medium are rounded shares; hard takes whatever is left so the
/// three always sum to `count`.
pub fn difficulty_quota(count: usize, config: &FinalExamConfig) -> [(Difficulty, usize); 3] {
    let d = config.difficulty_distribution;
    let easy = share(count, d.easy).min(count);
    let medium = share(count, d.medium).min(count - easy);
    let hard = count - easy - medium;
    [
        (Difficulty::Easy, easy),
        (Difficulty::Medium, medium),
        (Difficulty::Hard, hard),
    ]
}

/// Draw the questions for the next attempt at `exam`.
///
/// Questions shown in the most recent attempt go to the back of the line,
/// the draw follows the configured difficulty split as far as the pool
/// allows, and the result is shuffled and stamped with the config's
/// per-question time bounds.
pub fn select_questions_for_attempt<R: Rng + ?Sized>(
    exam: &FinalExam,
    rng: &mut R,
) -> Result<Vec<FinalExamQuestion>, ExamError> {
    let config = &exam.config;
    let count = config.questions_per_attempt as usize;
    if exam.question_pool.len() < count {
        return Err(ExamError::InsufficientPool {
            available: exam.question_pool.len(),
            required: count,
        });
    }

    let previous: HashSet<&str> = exam
        .attempts()
        .last()
        .map(|a| a.questions_used.iter().map(String::as_str).collect())
        .unwrap_or_default();

    let (mut fresh, mut used): (Vec<&FinalExamQuestion>, Vec<&FinalExamQuestion>) = exam
        .question_pool
        .iter()
        .partition(|q| !previous.contains(q.id.as_str()));
    shuffle_in_place(&mut fresh, rng);
    shuffle_in_place(&mut used, rng);
    let ordered: Vec<&FinalExamQuestion> = fresh.into_iter().chain(used).collect();

    let mut taken = vec![false; ordered.len()];
    let mut selected: Vec<&FinalExamQuestion> = Vec::with_capacity(count);
    for (difficulty, quota) in difficulty_quota(count, config) {
        let picks = ordered
            .iter()
            .enumerate()
            .filter(|(_, q)| q.difficulty == difficulty)
            .take(quota)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        for i in picks {
            taken[i] = true;
            selected.push(ordered[i]);
        }
    }

    // Top up from any difficulty when the pool cannot honour the split.
    if selected.len() < count {
        let shortfall = count - selected.len();
        tracing::debug!(shortfall, "difficulty split not satisfiable, filling from pool");
        for (i, q) in ordered.iter().enumerate() {
            if selected.len() == count {
                break;
            }
            if !taken[i] {
                taken[i] = true;
                selected.push(q);
            }
        }
    }

    let mut drawn: Vec<FinalExamQuestion> = selected
        .into_iter()
        .map(|q| FinalExamQuestion {
            min_time_seconds: config.min_time_per_question,
            max_time_seconds: config.max_time_per_question,
            ..q.clone()
        })
        .collect();
    shuffle_in_place(&mut drawn, rng);
    Ok(drawn)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::levels::exam_config;
    use crate::model::{CertificateLevel, FinalExamAttempt, QuestionType};
    use crate::shuffle::seeded_rng;

    fn q(id: usize, difficulty: Difficulty) -> FinalExamQuestion {
        FinalExamQuestion {
            id: format!("q{id}"),
            question: format!("question {id}"),
            question_type: QuestionType::TrueFalse,
            difficulty,
            options: Some(vec!["true".into(), "false".into()]),
            correct_answer: Some("true".into()),
            correct_answers: None,
            explanation: String::new(),
            code_context: None,
            topic: "t".into(),
            min_time_seconds: 0,
            max_time_seconds: 0,
        }
    }

    fn basico_pool() -> Vec<FinalExamQuestion> {
        // 12 easy, 12 medium, 6 hard
        (0..30)
            .map(|i| {
                let d = match i % 5 {
                    0 | 1 => Difficulty::Easy,
                    2 | 3 => Difficulty::Medium,
                    _ => Difficulty::Hard,
                };
                q(i, d)
            })
            .collect()
    }

    #[test]
    fn quota_rounds_and_sums() {
        let config = exam_config(CertificateLevel::Basico);
        // 15 * 40% = 6, 15 * 40% = 6, rest 3
        let quota = difficulty_quota(15, &config);
        assert_eq!(quota.map(|(_, n)| n), [6, 6, 3]);

        let config = exam_config(CertificateLevel::Intermediario);
        // 20 * 25% = 5, 20 * 45% = 9, rest 6
        assert_eq!(difficulty_quota(20, &config).map(|(_, n)| n), [5, 9, 6]);

        let config = exam_config(CertificateLevel::Avancado);
        // 25 * 15% = 3.75 -> 4, 25 * 40% = 10, rest 11
        assert_eq!(difficulty_quota(25, &config).map(|(_, n)| n), [4, 10, 11]);
    }

    #[test]
    fn quota_never_exceeds_count() {
        let mut config = exam_config(CertificateLevel::Basico);
        config.difficulty_distribution.easy = 50;
        config.difficulty_distribution.medium = 50;
        config.difficulty_distribution.hard = 0;
        assert_eq!(difficulty_quota(1, &config).map(|(_, n)| n), [1, 0, 0]);
    }

    #[test]
    fn draws_configured_split_and_stamps_times() {
        let exam =
            FinalExam::new("p", exam_config(CertificateLevel::Basico), basico_pool(), Utc::now());
        let drawn = select_questions_for_attempt(&exam, &mut seeded_rng(11)).unwrap();
        assert_eq!(drawn.len(), 15);
        let count = |d| drawn.iter().filter(|q| q.difficulty == d).count();
        assert_eq!(count(Difficulty::Easy), 6);
        assert_eq!(count(Difficulty::Medium), 6);
        assert_eq!(count(Difficulty::Hard), 3);
        assert!(drawn
            .iter()
            .all(|q| q.min_time_seconds == 15 && q.max_time_seconds == 120));
        let ids: HashSet<_> = drawn.iter().map(|q| &q.id).collect();
        assert_eq!(ids.len(), 15, "no duplicates");
    }

    #[test]
    fn fills_from_other_difficulties_when_short() {
        let pool: Vec<_> = (0..15).map(|i| q(i, Difficulty::Medium)).collect();
        let exam = FinalExam::new("p", exam_config(CertificateLevel::Basico), pool, Utc::now());
        let drawn = select_questions_for_attempt(&exam, &mut seeded_rng(2)).unwrap();
        assert_eq!(drawn.len(), 15);
    }

    #[test]
    fn previous_attempt_questions_are_deprioritized() {
        let mut exam =
            FinalExam::new("p", exam_config(CertificateLevel::Basico), basico_pool(), Utc::now());
        let first = select_questions_for_attempt(&exam, &mut seeded_rng(5)).unwrap();
        let now = Utc::now();
        exam.record_attempt(FinalExamAttempt {
            id: Uuid::new_v4(),
            attempt_number: 1,
            started_at: now,
            completed_at: now,
            score: 20,
            passed: false,
            answers: vec![],
            questions_used: first.iter().map(|q| q.id.clone()).collect(),
            total_time_seconds: 0,
            tab_away_count: 0,
        })
        .unwrap();

        let second = select_questions_for_attempt(&exam, &mut seeded_rng(6)).unwrap();
        let before: HashSet<_> = first.iter().map(|q| &q.id).collect();
        let after: HashSet<_> = second.iter().map(|q| &q.id).collect();
        // 15 fresh questions exist (6 easy, 6 medium, 3 hard), enough to fill
        // every quota without reuse.
        assert!(before.is_disjoint(&after));
    }

    #[test]
    fn pool_smaller_than_attempt_is_refused() {
        let pool: Vec<_> = (0..5).map(|i| q(i, Difficulty::Easy)).collect();
        let exam = FinalExam::new("p", exam_config(CertificateLevel::Basico), pool, Utc::now());
        let err = select_questions_for_attempt(&exam, &mut seeded_rng(1)).unwrap_err();
        assert!(matches!(
            err,
            ExamError::InsufficientPool {
                available: 5,
                required: 15
            }
        ));
    }
}
