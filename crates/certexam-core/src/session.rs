//! Exam session state machine.
//!
//! ```text
//! Intro ──Start──▶ Active ──(last Advance | global timeout)──▶ Result
//!   │                │
//!   └────Abandon─────┴──────────────▶ Abandoned
//!
//! Active, per question:  Answering ──Confirm | max time──▶ Confirmed ──Advance──▶ next
//! ```
//!
//! Every input is a [`SessionEvent`] carrying its own timestamp; the session
//! never reads a clock. [`ExamSession::dispatch`] is the transition function:
//! it consumes the current phase and an event and produces the next phase
//! plus a list of [`SessionEffect`]s for the host to act on.
//!
//! Confirmed answers are appended to an answer log and never touched again.
//! The attempt record is folded from that log exactly once, guarded by a
//! [`FinalizeLatch`], so the manual last-question path and the global
//! timeout path cannot both record an attempt.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::ExamError;
use crate::integrity::{BlockedActions, IntegrityMonitor, Interception, SurfaceAction};
use crate::model::{
    FinalExam, FinalExamAnswer, FinalExamAttempt, FinalExamQuestion, QuestionType, Response,
};
use crate::scoring::{evaluate, score_answers};
use crate::shuffle::shuffle_options;
use crate::timer::{ExamTimer, QuestionTimer};

/// One-shot guard on attempt finalization.
#[derive(Debug, Default)]
pub struct FinalizeLatch {
    fired: AtomicBool,
}

impl FinalizeLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the first caller only.
    pub fn try_acquire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// A drawn question with its options in this attempt's shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedQuestion {
    pub question: FinalExamQuestion,
    pub options: Option<Vec<String>>,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Leave the intro and start both timers.
    Start { now: DateTime<Utc> },
    /// Replace the in-flight selection for the current question.
    Select {
        response: Response,
        now: DateTime<Utc>,
    },
    /// Tick or untick one option of a multiple-select question.
    Toggle { option: String, now: DateTime<Utc> },
    /// Lock in the current selection.
    Confirm { now: DateTime<Utc> },
    /// Move past a confirmed question; finalizes after the last one.
    Advance { now: DateTime<Utc> },
    /// Periodic timer sample.
    Tick { now: DateTime<Utc> },
    VisibilityChanged { hidden: bool },
    /// Close the exam without recording anything.
    Abandon,
}

/// Why an event was refused. These are guarded preconditions, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The event needs an active attempt.
    NotActive,
    AlreadyStarted,
    /// The attempt has ended (result shown or abandoned).
    Finished,
    /// Confirm pressed before the question's minimum dwell time.
    MinTimeNotMet { secs_remaining: u32 },
    NoSelection,
    /// The current answer is confirmed and can no longer change.
    AnswerLocked,
    /// Advance pressed before the current answer was confirmed.
    NotConfirmed,
    InvalidResponse(String),
}

/// Observable consequences of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    Started {
        attempt_number: u32,
        question_count: usize,
    },
    QuestionPresented {
        index: usize,
    },
    AnswerConfirmed {
        index: usize,
        question_id: String,
        is_correct: bool,
        timed_out: bool,
    },
    Finalized(FinalExamAttempt),
    Abandoned,
    Rejected(Rejection),
}

/// Coarse phase, for callers that do not need the per-question detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Intro,
    Active,
    Result,
    Abandoned,
}

#[derive(Debug, Clone)]
enum Stage {
    Answering { selection: Option<Response> },
    Confirmed,
}

#[derive(Debug, Clone)]
struct ActiveState {
    index: usize,
    stage: Stage,
    exam_timer: ExamTimer,
    question_timer: QuestionTimer,
    log: Vec<FinalExamAnswer>,
}

#[derive(Debug, Clone)]
enum Phase {
    Intro,
    Active(ActiveState),
    Result(FinalExamAttempt),
    Abandoned,
}

/// Snapshot of what the exam surface should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView<'a> {
    pub phase: PhaseKind,
    pub index: usize,
    pub total: usize,
    pub question: Option<&'a PresentedQuestion>,
    pub selection: Option<&'a Response>,
    pub confirmed: bool,
    /// Whether the confirm control is enabled.
    pub can_confirm: bool,
    pub secs_until_unlock: u32,
    pub question_remaining_secs: u32,
    pub exam_remaining_secs: i64,
    /// Shown once the current answer is confirmed.
    pub explanation: Option<&'a str>,
    pub tab_away_count: u32,
    pub blocked_actions: BlockedActions,
}

/// One attempt at a final exam, from intro to result.
#[derive(Debug)]
pub struct ExamSession {
    exam_id: Uuid,
    attempt_number: u32,
    passing_score: u32,
    limit_secs: i64,
    questions: Vec<PresentedQuestion>,
    phase: Phase,
    integrity: IntegrityMonitor,
    latch: FinalizeLatch,
}

impl ExamSession {
    /// Prepare an attempt over `questions`, shuffling each question's options.
    pub fn new<R: Rng + ?Sized>(
        exam: &FinalExam,
        questions: Vec<FinalExamQuestion>,
        rng: &mut R,
    ) -> Result<Self, ExamError> {
        if questions.is_empty() {
            return Err(ExamError::InsufficientPool {
                available: 0,
                required: exam.config.questions_per_attempt as usize,
            });
        }
        let questions = questions
            .into_iter()
            .map(|question| {
                let options = shuffle_options(&question, rng);
                PresentedQuestion { question, options }
            })
            .collect();
        Ok(Self {
            exam_id: exam.id,
            attempt_number: exam.next_attempt_number(),
            passing_score: exam.config.passing_score,
            limit_secs: exam.config.max_time_secs(),
            questions,
            phase: Phase::Intro,
            integrity: IntegrityMonitor::new(),
            latch: FinalizeLatch::new(),
        })
    }

    pub fn exam_id(&self) -> Uuid {
        self.exam_id
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    pub fn questions(&self) -> &[PresentedQuestion] {
        &self.questions
    }

    pub fn phase(&self) -> PhaseKind {
        match self.phase {
            Phase::Intro => PhaseKind::Intro,
            Phase::Active(_) => PhaseKind::Active,
            Phase::Result(_) => PhaseKind::Result,
            Phase::Abandoned => PhaseKind::Abandoned,
        }
    }

    /// Confirmed answers so far, in question order.
    pub fn answers(&self) -> &[FinalExamAnswer] {
        match &self.phase {
            Phase::Active(state) => &state.log,
            Phase::Result(attempt) => &attempt.answers,
            Phase::Intro | Phase::Abandoned => &[],
        }
    }

    /// The recorded attempt, once the session reached its result.
    pub fn result(&self) -> Option<&FinalExamAttempt> {
        match &self.phase {
            Phase::Result(attempt) => Some(attempt),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Result(_) | Phase::Abandoned)
    }

    /// Ask whether a clipboard or context-menu action should be suppressed.
    pub fn intercept(&mut self, action: SurfaceAction) -> Interception {
        self.integrity.intercept(action)
    }

    /// Clipboard and context-menu actions suppressed during this attempt.
    pub fn blocked_actions(&self) -> BlockedActions {
        self.integrity.blocked()
    }

    pub fn view(&self, now: DateTime<Utc>) -> SessionView<'_> {
        let total = self.questions.len();
        let mut view = SessionView {
            phase: self.phase(),
            index: 0,
            total,
            question: None,
            selection: None,
            confirmed: false,
            can_confirm: false,
            secs_until_unlock: 0,
            question_remaining_secs: 0,
            exam_remaining_secs: self.limit_secs,
            explanation: None,
            tab_away_count: self.integrity.tab_away_count(),
            blocked_actions: self.integrity.blocked(),
        };
        if let Phase::Active(state) = &self.phase {
            let presented = &self.questions[state.index];
            view.index = state.index;
            view.question = Some(presented);
            view.exam_remaining_secs = state.exam_timer.remaining_secs(now);
            view.question_remaining_secs = state.question_timer.remaining_secs(now);
            view.secs_until_unlock = state.question_timer.secs_until_unlock(now);
            match &state.stage {
                Stage::Answering { selection } => {
                    view.selection = selection.as_ref();
                    view.can_confirm = state.question_timer.min_time_met(now)
                        && selection.as_ref().is_some_and(|s| !s.is_blank());
                }
                Stage::Confirmed => {
                    view.confirmed = true;
                    view.explanation = Some(presented.question.explanation.as_str());
                }
            }
        }
        view
    }

    /// Apply one event and report what happened.
    pub fn dispatch(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        let phase = std::mem::replace(&mut self.phase, Phase::Abandoned);
        let mut effects = Vec::new();
        self.phase = match phase {
            Phase::Intro => self.on_intro(event, &mut effects),
            Phase::Active(state) => self.on_active(state, event, &mut effects),
            finished @ (Phase::Result(_) | Phase::Abandoned) => {
                if !matches!(event, SessionEvent::Tick { .. }) {
                    effects.push(SessionEffect::Rejected(Rejection::Finished));
                }
                finished
            }
        };
        effects
    }

    fn on_intro(&mut self, event: SessionEvent, effects: &mut Vec<SessionEffect>) -> Phase {
        match event {
            SessionEvent::Start { now } => {
                let first = &self.questions[0].question;
                self.integrity.activate();
                tracing::info!(
                    exam_id = %self.exam_id,
                    attempt = self.attempt_number,
                    questions = self.questions.len(),
                    "final exam attempt started"
                );
                effects.push(SessionEffect::Started {
                    attempt_number: self.attempt_number,
                    question_count: self.questions.len(),
                });
                effects.push(SessionEffect::QuestionPresented { index: 0 });
                Phase::Active(ActiveState {
                    index: 0,
                    stage: Stage::Answering { selection: None },
                    exam_timer: ExamTimer::new(now, self.limit_secs),
                    question_timer: QuestionTimer::new(
                        now,
                        first.min_time_seconds,
                        first.max_time_seconds,
                    ),
                    log: Vec::with_capacity(self.questions.len()),
                })
            }
            SessionEvent::Abandon => {
                effects.push(SessionEffect::Abandoned);
                Phase::Abandoned
            }
            SessionEvent::Tick { .. } | SessionEvent::VisibilityChanged { .. } => Phase::Intro,
            _ => {
                effects.push(SessionEffect::Rejected(Rejection::NotActive));
                Phase::Intro
            }
        }
    }

    fn on_active(
        &mut self,
        mut state: ActiveState,
        event: SessionEvent,
        effects: &mut Vec<SessionEffect>,
    ) -> Phase {
        // Deadlines are applied before any timestamped event so a late
        // selection, confirm or advance cannot slip past an expired timer.
        if let SessionEvent::Select { now, .. }
        | SessionEvent::Toggle { now, .. }
        | SessionEvent::Confirm { now }
        | SessionEvent::Advance { now }
        | SessionEvent::Tick { now } = &event
        {
            if let Some(attempt) = self.apply_deadlines(&mut state, *now, effects) {
                return Phase::Result(attempt);
            }
        }

        match event {
            SessionEvent::Start { .. } => {
                effects.push(SessionEffect::Rejected(Rejection::AlreadyStarted));
            }
            SessionEvent::Select { response, .. } => {
                if let Err(rejection) = self.select(&mut state, response) {
                    effects.push(SessionEffect::Rejected(rejection));
                }
            }
            SessionEvent::Toggle { option, .. } => {
                if let Err(rejection) = self.toggle(&mut state, option) {
                    effects.push(SessionEffect::Rejected(rejection));
                }
            }
            SessionEvent::Confirm { now } => self.confirm(&mut state, now, effects),
            SessionEvent::Advance { now } => {
                if !matches!(state.stage, Stage::Confirmed) {
                    effects.push(SessionEffect::Rejected(Rejection::NotConfirmed));
                } else if state.index + 1 >= self.questions.len() {
                    if let Some(attempt) = self.finalize(&state, now, effects) {
                        return Phase::Result(attempt);
                    }
                } else {
                    state.index += 1;
                    let next = &self.questions[state.index].question;
                    state.stage = Stage::Answering { selection: None };
                    state
                        .question_timer
                        .restart(now, next.min_time_seconds, next.max_time_seconds);
                    effects.push(SessionEffect::QuestionPresented { index: state.index });
                }
            }
            SessionEvent::Tick { now } => {
                tracing::trace!(
                    remaining = state.exam_timer.remaining_secs(now),
                    "exam tick"
                );
            }
            SessionEvent::VisibilityChanged { hidden } => {
                self.integrity.on_visibility_change(hidden);
            }
            SessionEvent::Abandon => {
                self.integrity.deactivate();
                tracing::info!(
                    exam_id = %self.exam_id,
                    attempt = self.attempt_number,
                    discarded_answers = state.log.len(),
                    "final exam attempt abandoned"
                );
                effects.push(SessionEffect::Abandoned);
                return Phase::Abandoned;
            }
        }
        Phase::Active(state)
    }

    /// Fire whichever timers have expired at `now`. Returns the attempt if
    /// the global timer forced finalization.
    fn apply_deadlines(
        &mut self,
        state: &mut ActiveState,
        now: DateTime<Utc>,
        effects: &mut Vec<SessionEffect>,
    ) -> Option<FinalExamAttempt> {
        if state.exam_timer.poll(now) {
            tracing::info!(
                exam_id = %self.exam_id,
                attempt = self.attempt_number,
                "exam time exhausted, auto-submitting"
            );
            if matches!(state.stage, Stage::Answering { .. }) {
                self.record_current(state, now, true, effects);
            }
            return self.finalize(state, now, effects);
        }
        if matches!(state.stage, Stage::Answering { .. }) && state.question_timer.poll_expired(now)
        {
            tracing::debug!(index = state.index, "question time exhausted, auto-confirming");
            self.record_current(state, now, true, effects);
        }
        None
    }

    fn select(&self, state: &mut ActiveState, response: Response) -> Result<(), Rejection> {
        let Stage::Answering { selection } = &mut state.stage else {
            return Err(Rejection::AnswerLocked);
        };
        validate_response(&self.questions[state.index], &response)?;
        *selection = Some(response);
        Ok(())
    }

    fn toggle(&self, state: &mut ActiveState, option: String) -> Result<(), Rejection> {
        let Stage::Answering { selection } = &mut state.stage else {
            return Err(Rejection::AnswerLocked);
        };
        let presented = &self.questions[state.index];
        if presented.question.question_type != QuestionType::MultipleSelect {
            return Err(Rejection::InvalidResponse(
                "only multiple-select questions can toggle options".into(),
            ));
        }
        if !offers(presented, &option) {
            return Err(Rejection::InvalidResponse(format!("unknown option: {option}")));
        }
        let mut set = match selection.take() {
            Some(Response::Selection(set)) => set,
            _ => Default::default(),
        };
        if !set.remove(&option) {
            set.insert(option);
        }
        *selection = Some(Response::Selection(set));
        Ok(())
    }

    fn confirm(
        &mut self,
        state: &mut ActiveState,
        now: DateTime<Utc>,
        effects: &mut Vec<SessionEffect>,
    ) {
        let Stage::Answering { selection } = &state.stage else {
            effects.push(SessionEffect::Rejected(Rejection::AnswerLocked));
            return;
        };
        if !state.question_timer.min_time_met(now) {
            effects.push(SessionEffect::Rejected(Rejection::MinTimeNotMet {
                secs_remaining: state.question_timer.secs_until_unlock(now),
            }));
            return;
        }
        if selection.as_ref().map_or(true, Response::is_blank) {
            effects.push(SessionEffect::Rejected(Rejection::NoSelection));
            return;
        }
        self.record_current(state, now, false, effects);
    }

    /// Evaluate the in-flight selection, append it to the log, and lock the question.
    fn record_current(
        &mut self,
        state: &mut ActiveState,
        now: DateTime<Utc>,
        timed_out: bool,
        effects: &mut Vec<SessionEffect>,
    ) {
        let stage = std::mem::replace(&mut state.stage, Stage::Confirmed);
        let selection = match stage {
            Stage::Answering { selection } => selection,
            Stage::Confirmed => return,
        };
        let question = &self.questions[state.index].question;
        let time_spent = state.question_timer.elapsed_secs(now);
        let answer = evaluate(question, selection.as_ref(), time_spent);
        tracing::debug!(
            index = state.index,
            correct = answer.is_correct,
            timed_out,
            "answer confirmed"
        );
        effects.push(SessionEffect::AnswerConfirmed {
            index: state.index,
            question_id: answer.question_id.clone(),
            is_correct: answer.is_correct,
            timed_out,
        });
        state.log.push(answer);
    }

    fn finalize(
        &mut self,
        state: &ActiveState,
        now: DateTime<Utc>,
        effects: &mut Vec<SessionEffect>,
    ) -> Option<FinalExamAttempt> {
        if !self.latch.try_acquire() {
            return None;
        }
        self.integrity.deactivate();

        // Questions never reached count as blank, incorrect answers.
        let mut answers = state.log.clone();
        answers.extend(self.questions[answers.len()..].iter().map(|p| FinalExamAnswer {
            question_id: p.question.id.clone(),
            answer: String::new(),
            answers: None,
            time_spent_seconds: 0,
            is_correct: false,
        }));

        let card = score_answers(&answers, self.questions.len(), self.passing_score);
        let total_time = state.exam_timer.elapsed_secs(now).min(self.limit_secs);
        let attempt = FinalExamAttempt {
            id: Uuid::new_v4(),
            attempt_number: self.attempt_number,
            started_at: state.exam_timer.started_at(),
            completed_at: now,
            score: card.score,
            passed: card.passed,
            answers,
            questions_used: self.questions.iter().map(|p| p.question.id.clone()).collect(),
            total_time_seconds: u32::try_from(total_time).unwrap_or(u32::MAX),
            tab_away_count: self.integrity.tab_away_count(),
        };
        tracing::info!(
            exam_id = %self.exam_id,
            attempt = attempt.attempt_number,
            score = attempt.score,
            passed = attempt.passed,
            correct = card.correct,
            total = card.total,
            "final exam attempt finalized"
        );
        effects.push(SessionEffect::Finalized(attempt.clone()));
        Some(attempt)
    }
}

fn offers(presented: &PresentedQuestion, option: &str) -> bool {
    presented
        .options
        .as_ref()
        .is_some_and(|opts| opts.iter().any(|o| o == option))
}

fn validate_response(presented: &PresentedQuestion, response: &Response) -> Result<(), Rejection> {
    let qt = presented.question.question_type;
    match (qt, response) {
        (QuestionType::FillBlank, Response::Text(_)) => Ok(()),
        (QuestionType::MultipleSelect, Response::Selection(set)) => {
            match set.iter().find(|o| !offers(presented, o)) {
                Some(unknown) => Err(Rejection::InvalidResponse(format!(
                    "unknown option: {unknown}"
                ))),
                None => Ok(()),
            }
        }
        (
            QuestionType::MultipleChoice | QuestionType::TrueFalse | QuestionType::CodeOutput,
            Response::Choice(choice),
        ) => {
            if offers(presented, choice) {
                Ok(())
            } else {
                Err(Rejection::InvalidResponse(format!("unknown option: {choice}")))
            }
        }
        _ => Err(Rejection::InvalidResponse(format!(
            "response shape does not fit a {qt} question"
        ))),
    }
}
