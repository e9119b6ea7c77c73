//! End-to-end exam flows through the public engine API.
//!
//! Time is driven by a `ManualClock`, so nothing here sleeps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use certexam_core::clock::{Clock, ManualClock};
use certexam_core::diploma::IssueRequest;
use certexam_core::eligibility::evaluate;
use certexam_core::engine::ExamEngine;
use certexam_core::error::{ExamError, IssueError};
use certexam_core::model::{
    CertificateLevel, Difficulty, FinalExam, FinalExamAttempt, FinalExamQuestion, QuestionType,
    Response,
};
use certexam_core::plan::{
    LessonKey, LessonProgress, LessonTopic, PlanWeek, StudyPlan, StudyProfile,
};
use certexam_core::scoring::is_correct;
use certexam_core::session::{ExamSession, PhaseKind, Rejection, SessionEffect, SessionEvent};
use certexam_core::settings::EngineSettings;
use certexam_core::shuffle::{seeded_rng, shuffle};
use certexam_core::traits::{GenerationRequest, QuestionPoolGenerator, RewardSink};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("certexam_core=debug")
        .with_test_writer()
        .try_init();
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

struct FixedPool;

#[async_trait]
impl QuestionPoolGenerator for FixedPool {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> anyhow::Result<Vec<FinalExamQuestion>> {
        Ok((0..request.question_count as usize)
            .map(|i| FinalExamQuestion {
                id: format!("q{i:02}"),
                question: format!("Statement {i} holds?"),
                question_type: QuestionType::TrueFalse,
                difficulty: match i % 3 {
                    0 => Difficulty::Easy,
                    1 => Difficulty::Medium,
                    _ => Difficulty::Hard,
                },
                options: Some(vec!["true".into(), "false".into()]),
                correct_answer: Some("true".into()),
                correct_answers: None,
                explanation: format!("Statement {i} is true."),
                code_context: None,
                topic: request
                    .topics
                    .get(i % request.topics.len().max(1))
                    .map(|t| t.title.clone())
                    .unwrap_or_default(),
                min_time_seconds: 0,
                max_time_seconds: 0,
            })
            .collect())
    }
}

#[derive(Default)]
struct Ledger(Mutex<Vec<(u32, String)>>);

impl Ledger {
    fn total(&self) -> u32 {
        self.0.lock().unwrap().iter().map(|(xp, _)| xp).sum()
    }
}

impl RewardSink for Ledger {
    fn award(&self, amount: u32, reason: &str) {
        self.0.lock().unwrap().push((amount, reason.to_string()));
    }
}

fn profile() -> StudyProfile {
    StudyProfile {
        id: "profile-1".into(),
        user_id: "user-1".into(),
        skill_name: "Rust".into(),
        skill_category: "programming".into(),
        target_level: "basic".into(),
        display_name: Some("Ana".into()),
    }
}

fn plan() -> StudyPlan {
    let topic = |lesson: u32, title: &str| LessonTopic {
        week_number: 1,
        lesson_number: lesson,
        title: title.into(),
        description: String::new(),
    };
    StudyPlan {
        id: "plan-1".into(),
        weeks: vec![PlanWeek {
            week_number: 1,
            lesson_topics: vec![topic(1, "Ownership"), topic(2, "Traits")],
        }],
        total_hours: 12.0,
    }
}

fn lesson(completed: bool) -> LessonProgress {
    LessonProgress {
        is_completed: completed,
        exercises_total: 6,
        exercises_completed: if completed { 6 } else { 2 },
        quiz_passed: Some(completed),
    }
}

fn progress(completed: &[bool]) -> HashMap<LessonKey, LessonProgress> {
    completed
        .iter()
        .enumerate()
        .map(|(i, done)| (LessonKey::new(1, i as u32 + 1), lesson(*done)))
        .collect()
}

struct Harness {
    clock: Arc<ManualClock>,
    ledger: Arc<Ledger>,
    engine: ExamEngine,
}

fn harness() -> Harness {
    init_tracing();
    let clock = Arc::new(ManualClock::new(t0()));
    let ledger = Arc::new(Ledger::default());
    let engine = ExamEngine::new(
        Arc::new(FixedPool),
        ledger.clone(),
        clock.clone(),
        EngineSettings::default(),
    );
    Harness {
        clock,
        ledger,
        engine,
    }
}

/// Answer every question with `answer`, waiting `dwell` seconds on each.
fn run_through(
    h: &Harness,
    session: &mut ExamSession,
    answer: &str,
    dwell: i64,
) -> FinalExamAttempt {
    let effects = session.dispatch(SessionEvent::Start {
        now: h.clock.now(),
    });
    assert!(matches!(effects[0], SessionEffect::Started { .. }));

    let total = session.questions().len();
    for i in 0..total {
        session.dispatch(SessionEvent::Select {
            response: Response::Choice(answer.into()),
            now: h.clock.now(),
        });
        h.clock.advance_secs(dwell);
        let confirmed = session.dispatch(SessionEvent::Confirm {
            now: h.clock.now(),
        });
        h.engine.apply_effects(&confirmed);
        let advanced = session.dispatch(SessionEvent::Advance {
            now: h.clock.now(),
        });
        if i + 1 == total {
            match advanced.as_slice() {
                [SessionEffect::Finalized(attempt)] => return attempt.clone(),
                other => panic!("expected finalization, got {other:?}"),
            }
        }
    }
    unreachable!("session has at least one question")
}

#[tokio::test]
async fn full_attempt_passes_and_issues_diploma() {
    let h = harness();
    let plan = plan();
    let progress = progress(&[true, true]);
    let mut exam = h
        .engine
        .generate_exam(&profile(), &plan, CertificateLevel::Basico)
        .await
        .unwrap();
    assert_eq!(exam.question_pool.len(), 30);

    let mut rng = seeded_rng(11);
    let mut session = h
        .engine
        .start_attempt(&exam, Some(&plan), &progress, &mut rng)
        .unwrap();
    assert_eq!(session.questions().len(), 15);

    let attempt = run_through(&h, &mut session, "true", 16);
    assert_eq!(attempt.score, 100);
    assert!(attempt.passed);
    assert_eq!(attempt.total_time_seconds, 15 * 16);
    assert_eq!(session.phase(), PhaseKind::Result);

    assert!(h.engine.record_attempt(&mut exam, attempt).unwrap());
    assert_eq!(h.ledger.total(), 15 * 10 + 200);

    let verdict = evaluate(Some(&plan), &progress, CertificateLevel::Basico, Some(&exam));
    assert!(verdict.is_eligible, "{:?}", verdict.reasons);

    let student = profile();
    let request = IssueRequest {
        plan: Some(&plan),
        profile: Some(&student),
        exam: Some(&exam),
        level: CertificateLevel::Basico,
        progress: &verdict.progress,
        student_name: None,
        disclaimer_acknowledged: true,
    };
    let diploma = h.engine.issue_diploma(request, &mut rng).unwrap();
    assert!(diploma.id().starts_with("MELA-2026-"));
    assert_eq!(diploma.student_name(), "Ana");
    assert_eq!(diploma.final_exam_score(), 100);
    assert_eq!(diploma.lessons_completed(), 2);

    assert!(matches!(
        h.engine.start_attempt(&exam, Some(&plan), &progress, &mut rng),
        Err(ExamError::AlreadyPassed)
    ));
}

#[tokio::test]
async fn failed_attempt_starts_the_cooldown() {
    let h = harness();
    let plan = plan();
    let progress = progress(&[true, true]);
    let mut exam = h
        .engine
        .generate_exam(&profile(), &plan, CertificateLevel::Basico)
        .await
        .unwrap();
    let mut rng = seeded_rng(3);

    let mut session = h
        .engine
        .start_attempt(&exam, Some(&plan), &progress, &mut rng)
        .unwrap();
    let attempt = run_through(&h, &mut session, "false", 20);
    assert_eq!(attempt.score, 0);
    assert!(!h.engine.record_attempt(&mut exam, attempt).unwrap());

    h.clock.advance(Duration::hours(23));
    match h.engine.start_attempt(&exam, Some(&plan), &progress, &mut rng) {
        Err(ExamError::CooldownActive { wait_until }) => {
            assert_eq!(wait_until, exam.last_attempt_at().unwrap() + Duration::hours(24));
        }
        other => panic!("expected cooldown, got {:?}", other.map(|s| s.attempt_number())),
    }

    h.clock.advance(Duration::hours(1));
    let second = h
        .engine
        .start_attempt(&exam, Some(&plan), &progress, &mut rng)
        .unwrap();
    assert_eq!(second.attempt_number(), 2);
}

#[tokio::test]
async fn unfinished_lessons_block_the_exam() {
    let h = harness();
    let plan = plan();
    let exam = h
        .engine
        .generate_exam(&profile(), &plan, CertificateLevel::Basico)
        .await
        .unwrap();

    let err = h
        .engine
        .start_attempt(&exam, Some(&plan), &progress(&[true, false]), &mut seeded_rng(1))
        .unwrap_err();
    match err {
        ExamError::PrerequisitesUnmet(reasons) => {
            assert_eq!(reasons[0], "Complete all lessons (1/2)");
        }
        other => panic!("expected unmet prerequisites, got {other}"),
    }
}

#[tokio::test]
async fn global_timeout_finalizes_exactly_once() {
    let h = harness();
    let plan = plan();
    let exam = h
        .engine
        .generate_exam(&profile(), &plan, CertificateLevel::Basico)
        .await
        .unwrap();
    let mut session = h
        .engine
        .start_attempt(&exam, Some(&plan), &progress(&[true, true]), &mut seeded_rng(5))
        .unwrap();

    session.dispatch(SessionEvent::Start {
        now: h.clock.now(),
    });
    session.dispatch(SessionEvent::Select {
        response: Response::Choice("true".into()),
        now: h.clock.now(),
    });

    h.clock.advance_secs(30 * 60 + 1);
    let effects = session.dispatch(SessionEvent::Tick {
        now: h.clock.now(),
    });
    let finalized: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            SessionEffect::Finalized(a) => Some(a),
            _ => None,
        })
        .collect();
    assert_eq!(finalized.len(), 1);
    let attempt = finalized[0];
    assert_eq!(attempt.answers.len(), 15);
    assert!(attempt.answers[0].is_correct, "in-flight selection is kept");
    assert_eq!(attempt.score, 7);
    assert_eq!(attempt.total_time_seconds, 30 * 60);

    h.clock.advance_secs(5);
    assert!(session
        .dispatch(SessionEvent::Tick {
            now: h.clock.now()
        })
        .is_empty());
    assert_eq!(
        session.dispatch(SessionEvent::Confirm {
            now: h.clock.now()
        }),
        vec![SessionEffect::Rejected(Rejection::Finished)]
    );
}

#[tokio::test]
async fn confirmed_answers_are_final() {
    let h = harness();
    let plan = plan();
    let exam = h
        .engine
        .generate_exam(&profile(), &plan, CertificateLevel::Basico)
        .await
        .unwrap();
    let mut session = h
        .engine
        .start_attempt(&exam, Some(&plan), &progress(&[true, true]), &mut seeded_rng(8))
        .unwrap();

    session.dispatch(SessionEvent::Start {
        now: h.clock.now(),
    });
    session.dispatch(SessionEvent::Select {
        response: Response::Choice("false".into()),
        now: h.clock.now(),
    });
    h.clock.advance_secs(10);
    assert_eq!(
        session.dispatch(SessionEvent::Confirm {
            now: h.clock.now()
        }),
        vec![SessionEffect::Rejected(Rejection::MinTimeNotMet {
            secs_remaining: 5
        })]
    );
    h.clock.advance_secs(5);
    session.dispatch(SessionEvent::Confirm {
        now: h.clock.now(),
    });
    assert_eq!(
        session.dispatch(SessionEvent::Select {
            response: Response::Choice("true".into()),
            now: h.clock.now(),
        }),
        vec![SessionEffect::Rejected(Rejection::AnswerLocked)]
    );
    assert!(!session.answers()[0].is_correct);
    assert!(session.view(h.clock.now()).explanation.is_some());
}

#[test]
fn multiple_select_requires_the_exact_set() {
    let question = FinalExamQuestion {
        id: "ms".into(),
        question: "Pick the integer types".into(),
        question_type: QuestionType::MultipleSelect,
        difficulty: Difficulty::Medium,
        options: Some(vec!["A".into(), "B".into(), "C".into(), "D".into()]),
        correct_answer: None,
        correct_answers: Some(vec!["A".into(), "B".into(), "C".into()]),
        explanation: String::new(),
        code_context: None,
        topic: String::new(),
        min_time_seconds: 15,
        max_time_seconds: 120,
    };
    let set = |items: &[&str]| Response::Selection(items.iter().map(|s| s.to_string()).collect());
    assert!(!is_correct(&question, Some(&set(&["A", "B"]))));
    assert!(!is_correct(&question, Some(&set(&["A", "B", "C", "D"]))));
    assert!(is_correct(&question, Some(&set(&["C", "B", "A"]))));
}

#[test]
fn eligibility_counts_lessons() {
    let plan = plan();
    let exam = FinalExam::new(
        "plan-1",
        certexam_core::levels::exam_config(CertificateLevel::Basico),
        vec![],
        t0(),
    );

    let done = evaluate(
        Some(&plan),
        &progress(&[true, true]),
        CertificateLevel::Basico,
        Some(&exam),
    );
    assert!(done.progress.all_weeks_completed);
    assert_eq!(done.reasons, vec!["Pass the final exam".to_string()]);

    let half = evaluate(
        Some(&plan),
        &progress(&[true, false]),
        CertificateLevel::Basico,
        Some(&exam),
    );
    assert!(!half.progress.all_weeks_completed);
    assert!(half.reasons.contains(&"Complete all lessons (1/2)".to_string()));
    assert!(!half.is_eligible);
}

#[test]
fn diploma_refused_without_disclaimer() {
    let h = harness();
    let plan = plan();
    let student = profile();
    let snapshot = Default::default();
    let request = IssueRequest {
        plan: Some(&plan),
        profile: Some(&student),
        exam: None,
        level: CertificateLevel::Basico,
        progress: &snapshot,
        student_name: None,
        disclaimer_acknowledged: false,
    };
    assert_eq!(
        h.engine.issue_diploma(request, &mut seeded_rng(1)).unwrap_err(),
        IssueError::DisclaimerNotAcknowledged
    );
    let request = IssueRequest {
        disclaimer_acknowledged: true,
        ..request
    };
    assert_eq!(
        h.engine.issue_diploma(request, &mut seeded_rng(1)).unwrap_err(),
        IssueError::ExamNotPassed
    );
}

#[test]
fn option_shuffle_is_roughly_uniform() {
    let options = ["A", "B", "C", "D"];
    let mut rng = seeded_rng(2024);
    let mut first = HashMap::new();
    let runs = 8000;
    for _ in 0..runs {
        *first.entry(shuffle(&options, &mut rng)[0]).or_insert(0u32) += 1;
    }
    for option in options {
        let share = f64::from(first[option]) / f64::from(runs);
        assert!((share - 0.25).abs() < 0.03, "{option} led {share:.3} of shuffles");
    }
}
