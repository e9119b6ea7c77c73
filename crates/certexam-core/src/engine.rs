//! Exam engine orchestrator.
//!
//! Ties the pure pieces together: generates pools with retries, gates and
//! starts attempts, records finished attempts, pays out rewards, and issues
//! diplomas.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::clock::Clock;
use crate::cooldown::can_retake;
use crate::diploma::{CourseDiploma, DiplomaIssuer, IssueRequest};
use crate::driver::{self, SessionHandle};
use crate::eligibility::{self, can_take_exam, CertificateEligibility};
use crate::error::{ExamError, GenerationError, IssueError};
use crate::model::{CertificateLevel, FinalExam, FinalExamAttempt};
use crate::plan::{ProgressSource, StudyPlan, StudyProfile};
use crate::selection::select_questions_for_attempt;
use crate::session::{ExamSession, SessionEffect};
use crate::settings::EngineSettings;
use crate::traits::{GenerationRequest, QuestionPoolGenerator, RewardEvent, RewardSink};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// The central exam engine.
pub struct ExamEngine {
    generator: Arc<dyn QuestionPoolGenerator>,
    rewards: Arc<dyn RewardSink>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    issuer: DiplomaIssuer,
}

impl ExamEngine {
    pub fn new(
        generator: Arc<dyn QuestionPoolGenerator>,
        rewards: Arc<dyn RewardSink>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let issuer = DiplomaIssuer::new(settings.diploma_id_prefix.clone());
        Self {
            generator,
            rewards,
            clock,
            settings,
            issuer,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Generate a fresh final exam for `plan` at `level`.
    ///
    /// Transient generator failures are retried with exponential backoff;
    /// permanent ones are returned at once. Nothing is created on failure.
    pub async fn generate_exam(
        &self,
        profile: &StudyProfile,
        plan: &StudyPlan,
        level: CertificateLevel,
    ) -> Result<FinalExam, ExamError> {
        let config = self.settings.exam_config(level)?;
        let request = GenerationRequest::new(profile, plan, &config);
        let required = config.questions_per_attempt as usize;

        let mut last_error = None;
        let mut retry_delay = Duration::from_millis(self.settings.generation_retry_delay_ms);
        for retry in 0..=self.settings.generation_max_retries {
            if retry > 0 {
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
            }
            match self.generator.generate(&request).await {
                Ok(pool) => {
                    let total = pool.len();
                    let pool: Vec<_> = pool.into_iter().filter(|q| q.is_scorable()).collect();
                    if pool.len() < total {
                        tracing::warn!(
                            dropped = total - pool.len(),
                            "discarded unscorable generated questions"
                        );
                    }
                    if pool.len() < required {
                        let err = GenerationError::InsufficientPool {
                            available: pool.len(),
                            required,
                        };
                        tracing::warn!(retry, "{err}");
                        last_error = Some(err.to_string());
                        continue;
                    }
                    let exam = FinalExam::new(plan.id.clone(), config, pool, self.clock.now());
                    tracing::info!(
                        exam_id = %exam.id,
                        plan_id = %plan.id,
                        %level,
                        generator = self.generator.name(),
                        questions = exam.question_pool.len(),
                        "generated final exam"
                    );
                    return Ok(exam);
                }
                Err(e) => {
                    if let Some(gen_err) = e.downcast_ref::<GenerationError>() {
                        if gen_err.is_permanent() {
                            tracing::error!("question generation rejected: {e:#}");
                            return Err(ExamError::Generation(format!("{e:#}")));
                        }
                        if let Some(ms) = gen_err.retry_after_ms() {
                            retry_delay = Duration::from_millis(ms);
                        }
                    }
                    tracing::warn!(retry, "question generation failed: {e:#}");
                    last_error = Some(format!("{e:#}"));
                }
            }
        }

        let message = last_error.unwrap_or_else(|| "unknown error".to_string());
        tracing::error!(
            retries = self.settings.generation_max_retries,
            "giving up on question generation: {message}"
        );
        Err(ExamError::Generation(message))
    }

    /// Draw questions and open a session for the next attempt.
    ///
    /// Requires the exam prerequisites, an unpassed exam, and an elapsed
    /// cooldown.
    pub fn start_attempt<R: Rng + ?Sized>(
        &self,
        exam: &FinalExam,
        plan: Option<&StudyPlan>,
        progress: &dyn ProgressSource,
        rng: &mut R,
    ) -> Result<ExamSession, ExamError> {
        let gate = can_take_exam(plan, progress, exam.config.level);
        if !gate.can_take {
            return Err(ExamError::PrerequisitesUnmet(gate.reasons));
        }
        if exam.is_passed() {
            return Err(ExamError::AlreadyPassed);
        }
        let status = can_retake(exam, self.clock.now());
        if let (false, Some(wait_until)) = (status.can_retake, status.wait_until) {
            return Err(ExamError::CooldownActive { wait_until });
        }
        let questions = select_questions_for_attempt(exam, rng)?;
        ExamSession::new(exam, questions, rng)
    }

    /// Append a finished attempt to `exam` and pay out the pass reward on
    /// the first passing attempt. Returns whether the exam was newly passed.
    pub fn record_attempt(
        &self,
        exam: &mut FinalExam,
        attempt: FinalExamAttempt,
    ) -> Result<bool, ExamError> {
        let newly_passed = exam.record_attempt(attempt)?;
        if newly_passed {
            self.reward(RewardEvent::ExamPassed {
                level: exam.config.level,
            });
        }
        Ok(newly_passed)
    }

    /// Run `session` on the engine clock, sampling timers at the configured
    /// `tick_interval_ms`.
    pub fn spawn_session(&self, session: ExamSession) -> anyhow::Result<SessionHandle> {
        driver::spawn(session, self.clock.clone(), self.settings.tick_interval())
    }

    /// Pay out per-question rewards for a batch of session effects.
    pub fn apply_effects(&self, effects: &[SessionEffect]) {
        for effect in effects {
            if let SessionEffect::AnswerConfirmed {
                is_correct: true, ..
            } = effect
            {
                self.reward(RewardEvent::QuestionCorrect);
            }
        }
    }

    pub fn reward(&self, event: RewardEvent) {
        let amount = event.amount(self.settings.question_correct_xp);
        tracing::debug!(?event, amount, "awarding xp");
        self.rewards.award(amount, &event.reason());
    }

    pub fn eligibility(
        &self,
        plan: Option<&StudyPlan>,
        progress: &dyn ProgressSource,
        level: CertificateLevel,
        exam: Option<&FinalExam>,
    ) -> CertificateEligibility {
        eligibility::evaluate(plan, progress, level, exam)
    }

    /// Issue a diploma stamped with the engine clock.
    pub fn issue_diploma<R: Rng + ?Sized>(
        &self,
        request: IssueRequest<'_>,
        rng: &mut R,
    ) -> Result<CourseDiploma, IssueError> {
        self.issuer.issue(request, self.clock.now(), rng)
    }
}
