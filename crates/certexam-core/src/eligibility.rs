//! Certificate eligibility and the exam prerequisite gate.
//!
//! Both checks are pure folds over the plan and the progress source, and are
//! recomputed on every call.

use serde::{Deserialize, Serialize};

use crate::levels::describe;
use crate::model::{CertificateLevel, FinalExam};
use crate::plan::{ProgressSource, StudyPlan};

/// Completion counts behind an eligibility verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub lessons_completed: u32,
    pub total_lessons: u32,
    pub exercises_completed: u32,
    pub total_exercises: u32,
    pub quizzes_passed: u32,
    pub total_quizzes: u32,
    pub all_weeks_completed: bool,
    pub minimum_exercises_met: bool,
    pub final_exam_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateEligibility {
    pub is_eligible: bool,
    /// One message per unmet condition; empty iff eligible.
    pub reasons: Vec<String>,
    pub progress: ProgressSnapshot,
}

/// Whether the exam itself may be taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamGate {
    pub can_take: bool,
    pub reasons: Vec<String>,
}

pub const NO_PLAN_REASON: &str = "No study plan loaded";

fn tally(
    plan: &StudyPlan,
    progress: &dyn ProgressSource,
    level: CertificateLevel,
) -> ProgressSnapshot {
    let mut snap = ProgressSnapshot::default();
    for topic in plan.topics() {
        snap.total_lessons += 1;
        let Some(lesson) = progress.lesson(topic.key()) else {
            continue;
        };
        if lesson.is_completed {
            snap.lessons_completed += 1;
        }
        snap.total_exercises += lesson.exercises_total;
        snap.exercises_completed += lesson.exercises_completed.min(lesson.exercises_total);
        if let Some(passed) = lesson.quiz_passed {
            snap.total_quizzes += 1;
            if passed {
                snap.quizzes_passed += 1;
            }
        }
    }
    snap.all_weeks_completed =
        snap.total_lessons > 0 && snap.lessons_completed == snap.total_lessons;
    snap.minimum_exercises_met = snap.exercises_completed >= describe(level).minimum_exercises;
    snap
}

/// Messages for the unmet prerequisites, in lessons, exercises, quizzes order.
fn prerequisite_reasons(snap: &ProgressSnapshot, level: CertificateLevel) -> Vec<String> {
    let minimum = describe(level).minimum_exercises;
    let mut reasons = Vec::new();
    if !snap.all_weeks_completed {
        reasons.push(format!(
            "Complete all lessons ({}/{})",
            snap.lessons_completed, snap.total_lessons
        ));
    }
    if !snap.minimum_exercises_met {
        reasons.push(format!(
            "Complete at least {minimum} exercises ({}/{minimum})",
            snap.exercises_completed
        ));
    }
    if snap.total_quizzes > 0 && snap.quizzes_passed < snap.total_quizzes {
        reasons.push(format!(
            "Pass every lesson quiz ({}/{})",
            snap.quizzes_passed, snap.total_quizzes
        ));
    }
    reasons
}

/// Evaluate certificate eligibility for `level`.
///
/// A missing plan is not an error: it yields an ineligible verdict with an
/// explicit reason.
pub fn evaluate(
    plan: Option<&StudyPlan>,
    progress: &dyn ProgressSource,
    level: CertificateLevel,
    exam: Option<&FinalExam>,
) -> CertificateEligibility {
    let final_exam_passed = exam.is_some_and(FinalExam::is_passed);
    let Some(plan) = plan else {
        return CertificateEligibility {
            is_eligible: false,
            reasons: vec![NO_PLAN_REASON.to_string()],
            progress: ProgressSnapshot {
                final_exam_passed,
                ..ProgressSnapshot::default()
            },
        };
    };

    let mut snap = tally(plan, progress, level);
    snap.final_exam_passed = final_exam_passed;
    let mut reasons = prerequisite_reasons(&snap, level);
    if !final_exam_passed {
        reasons.push("Pass the final exam".to_string());
    }
    CertificateEligibility {
        is_eligible: reasons.is_empty(),
        reasons,
        progress: snap,
    }
}

/// The eligibility conditions minus the final exam itself.
pub fn can_take_exam(
    plan: Option<&StudyPlan>,
    progress: &dyn ProgressSource,
    level: CertificateLevel,
) -> ExamGate {
    let Some(plan) = plan else {
        return ExamGate {
            can_take: false,
            reasons: vec![NO_PLAN_REASON.to_string()],
        };
    };
    let reasons = prerequisite_reasons(&tally(plan, progress, level), level);
    ExamGate {
        can_take: reasons.is_empty(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::levels::exam_config;
    use crate::model::FinalExamAttempt;
    use crate::plan::{LessonKey, LessonProgress, LessonTopic, PlanWeek};

    fn plan(lessons: &[(u32, u32)]) -> StudyPlan {
        let mut weeks: Vec<PlanWeek> = Vec::new();
        for &(week, lesson) in lessons {
            let topic = LessonTopic {
                week_number: week,
                lesson_number: lesson,
                title: format!("W{week}L{lesson}"),
                description: String::new(),
            };
            match weeks.iter_mut().find(|w| w.week_number == week) {
                Some(w) => w.lesson_topics.push(topic),
                None => weeks.push(PlanWeek {
                    week_number: week,
                    lesson_topics: vec![topic],
                }),
            }
        }
        StudyPlan {
            id: "plan".into(),
            weeks,
            total_hours: 12.0,
        }
    }

    fn done(exercises: u32, quiz: Option<bool>) -> LessonProgress {
        LessonProgress {
            is_completed: true,
            exercises_total: exercises,
            exercises_completed: exercises,
            quiz_passed: quiz,
        }
    }

    fn passed_exam() -> FinalExam {
        let mut exam =
            FinalExam::new("plan", exam_config(CertificateLevel::Basico), vec![], Utc::now());
        let now = Utc::now();
        exam.record_attempt(FinalExamAttempt {
            id: Uuid::new_v4(),
            attempt_number: 1,
            started_at: now,
            completed_at: now,
            score: 93,
            passed: true,
            answers: vec![],
            questions_used: vec![],
            total_time_seconds: 600,
            tab_away_count: 0,
        })
        .unwrap();
        exam
    }

    #[test]
    fn everything_done_is_eligible() {
        let plan = plan(&[(1, 1), (2, 1)]);
        let progress = HashMap::from([
            (LessonKey::new(1, 1), done(5, None)),
            (LessonKey::new(2, 1), done(5, None)),
        ]);
        let exam = passed_exam();
        let verdict = evaluate(Some(&plan), &progress, CertificateLevel::Basico, Some(&exam));
        assert!(verdict.is_eligible);
        assert!(verdict.reasons.is_empty());
        assert_eq!(verdict.progress.exercises_completed, 10);
        assert!(verdict.progress.minimum_exercises_met);
        assert_eq!(verdict.progress.total_quizzes, 0);
    }

    #[test]
    fn incomplete_lesson_reports_only_that() {
        let plan = plan(&[(1, 1), (1, 2)]);
        let mut half = done(0, Some(true));
        half.is_completed = false;
        let progress = HashMap::from([
            (LessonKey::new(1, 1), done(10, Some(true))),
            (LessonKey::new(1, 2), half),
        ]);
        let exam = passed_exam();
        let verdict = evaluate(Some(&plan), &progress, CertificateLevel::Basico, Some(&exam));
        assert!(!verdict.is_eligible);
        assert_eq!(verdict.reasons, vec!["Complete all lessons (1/2)".to_string()]);
    }

    #[test]
    fn reasons_follow_fixed_order() {
        let plan = plan(&[(1, 1), (1, 2)]);
        let progress = HashMap::from([(LessonKey::new(1, 1), done(3, Some(false)))]);
        let verdict = evaluate(Some(&plan), &progress, CertificateLevel::Intermediario, None);
        assert_eq!(
            verdict.reasons,
            vec![
                "Complete all lessons (1/2)".to_string(),
                "Complete at least 20 exercises (3/20)".to_string(),
                "Pass every lesson quiz (0/1)".to_string(),
                "Pass the final exam".to_string(),
            ]
        );
        assert!(!verdict.progress.final_exam_passed);
    }

    #[test]
    fn empty_plan_is_not_vacuously_complete() {
        let plan = plan(&[]);
        let progress: HashMap<LessonKey, LessonProgress> = HashMap::new();
        let verdict = evaluate(Some(&plan), &progress, CertificateLevel::Basico, None);
        assert!(!verdict.progress.all_weeks_completed);
        assert_eq!(verdict.reasons[0], "Complete all lessons (0/0)");
    }

    #[test]
    fn missing_plan_is_explained() {
        let progress: HashMap<LessonKey, LessonProgress> = HashMap::new();
        let verdict = evaluate(None, &progress, CertificateLevel::Basico, None);
        assert!(!verdict.is_eligible);
        assert_eq!(verdict.reasons, vec![NO_PLAN_REASON.to_string()]);

        let gate = can_take_exam(None, &progress, CertificateLevel::Basico);
        assert!(!gate.can_take);
    }

    #[test]
    fn gate_ignores_the_exam() {
        let plan = plan(&[(1, 1)]);
        let progress = HashMap::from([(LessonKey::new(1, 1), done(10, Some(true)))]);
        let gate = can_take_exam(Some(&plan), &progress, CertificateLevel::Basico);
        assert!(gate.can_take);
        assert!(gate.reasons.is_empty());

        let verdict = evaluate(Some(&plan), &progress, CertificateLevel::Basico, None);
        assert_eq!(verdict.reasons, vec!["Pass the final exam".to_string()]);
    }

    #[test]
    fn verdict_tracks_progress_changes() {
        let plan = plan(&[(1, 1)]);
        let mut progress = HashMap::from([(LessonKey::new(1, 1), done(2, None))]);
        let before = can_take_exam(Some(&plan), &progress, CertificateLevel::Basico);
        assert!(!before.can_take);
        progress.insert(LessonKey::new(1, 1), done(10, None));
        let after = can_take_exam(Some(&plan), &progress, CertificateLevel::Basico);
        assert!(after.can_take);
    }
}
