//! Collaborator traits: question generation, completion transport, rewards,
//! and diploma rendering.
//!
//! The async traits are implemented by `certexam-providers` and
//! `certexam-report`; hosts supply their own [`RewardSink`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::diploma::CourseDiploma;
use crate::levels::{final_exam_xp_reward, QUIZ_PASSED_XP};
use crate::model::{CertificateLevel, DifficultyDistribution, FinalExamConfig, FinalExamQuestion};
use crate::plan::{LessonTopic, StudyPlan, StudyProfile};

// ---------------------------------------------------------------------------
// Question pool generation
// ---------------------------------------------------------------------------

/// What to generate a question pool for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub skill_name: String,
    pub skill_category: String,
    pub level: CertificateLevel,
    /// Every lesson topic of the plan, in plan order.
    pub topics: Vec<LessonTopic>,
    /// Pool size to aim for.
    pub question_count: u32,
    /// Fewest usable questions that still make a viable pool.
    pub min_questions: u32,
    pub difficulty_distribution: DifficultyDistribution,
}

impl GenerationRequest {
    pub fn new(profile: &StudyProfile, plan: &StudyPlan, config: &FinalExamConfig) -> Self {
        Self {
            skill_name: profile.skill_name.clone(),
            skill_category: profile.skill_category.clone(),
            level: config.level,
            topics: plan.topics().cloned().collect(),
            question_count: config.total_questions,
            min_questions: config.questions_per_attempt,
            difficulty_distribution: config.difficulty_distribution,
        }
    }
}

/// Builds the question pool for a final exam. Remote and slow in practice.
#[async_trait]
pub trait QuestionPoolGenerator: Send + Sync {
    /// Human-readable generator name (e.g. "batched").
    fn name(&self) -> &str;

    /// Generate questions for `request`.
    ///
    /// Failures should carry a [`GenerationError`](crate::error::GenerationError)
    /// so the engine can tell transient from permanent ones.
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Vec<FinalExamQuestion>>;
}

/// A single prompt for a text completion backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionPrompt {
    #[serde(default)]
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Transport-agnostic text completion. The workspace ships no network client.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &CompletionPrompt) -> anyhow::Result<String>;
}

// ---------------------------------------------------------------------------
// Rewards
// ---------------------------------------------------------------------------

/// Something worth XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardEvent {
    /// An exam question answered correctly.
    QuestionCorrect,
    QuizPassed,
    /// First passing attempt at a final exam.
    ExamPassed { level: CertificateLevel },
}

impl RewardEvent {
    /// XP for this event; `question_xp` comes from engine settings.
    pub fn amount(self, question_xp: u32) -> u32 {
        match self {
            RewardEvent::QuestionCorrect => question_xp,
            RewardEvent::QuizPassed => QUIZ_PASSED_XP,
            RewardEvent::ExamPassed { level } => final_exam_xp_reward(level),
        }
    }

    pub fn reason(self) -> String {
        match self {
            RewardEvent::QuestionCorrect => "Correct answer on the final exam".to_string(),
            RewardEvent::QuizPassed => "Quiz passed".to_string(),
            RewardEvent::ExamPassed { level } => format!("Final exam passed (level {level})"),
        }
    }
}

/// Receives XP awards.
pub trait RewardSink: Send + Sync {
    fn award(&self, amount: u32, reason: &str);
}

/// Discards every award.
pub struct NoopRewards;

impl RewardSink for NoopRewards {
    fn award(&self, _: u32, _: &str) {}
}

// ---------------------------------------------------------------------------
// Diploma rendering
// ---------------------------------------------------------------------------

/// Turns a diploma into a printable document.
#[async_trait]
pub trait DiplomaRenderer: Send + Sync {
    /// MIME type of the rendered bytes.
    fn content_type(&self) -> &str;

    async fn render(&self, diploma: &CourseDiploma) -> anyhow::Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::exam_config;
    use crate::plan::PlanWeek;

    #[test]
    fn reward_amounts() {
        assert_eq!(RewardEvent::QuestionCorrect.amount(10), 10);
        assert_eq!(RewardEvent::QuizPassed.amount(10), 35);
        assert_eq!(
            RewardEvent::ExamPassed {
                level: CertificateLevel::Avancado
            }
            .amount(10),
            500
        );
        assert!(RewardEvent::ExamPassed {
            level: CertificateLevel::Basico
        }
        .reason()
        .contains("basico"));
    }

    #[test]
    fn request_collects_all_topics() {
        let topic = |w, l| LessonTopic {
            week_number: w,
            lesson_number: l,
            title: format!("{w}.{l}"),
            description: String::new(),
        };
        let plan = StudyPlan {
            id: "p".into(),
            weeks: vec![
                PlanWeek {
                    week_number: 1,
                    lesson_topics: vec![topic(1, 1), topic(1, 2)],
                },
                PlanWeek {
                    week_number: 2,
                    lesson_topics: vec![topic(2, 1)],
                },
            ],
            total_hours: 6.0,
        };
        let profile = StudyProfile {
            id: "x".into(),
            user_id: "u".into(),
            skill_name: "SQL".into(),
            skill_category: "data".into(),
            target_level: "intermediate".into(),
            display_name: None,
        };
        let config = exam_config(CertificateLevel::Intermediario);
        let request = GenerationRequest::new(&profile, &plan, &config);
        assert_eq!(request.topics.len(), 3);
        assert_eq!(request.question_count, 35);
        assert_eq!(request.min_questions, 20);
        assert_eq!(request.level, CertificateLevel::Intermediario);
        assert_eq!(request.topics[2], topic(2, 1));

        // Requests compare by content, topics included.
        assert_eq!(GenerationRequest::new(&profile, &plan, &config), request);
        let mut renamed = plan.clone();
        renamed.weeks[1].lesson_topics[0].title = "joins".into();
        assert_ne!(plan, renamed);
        assert_ne!(GenerationRequest::new(&profile, &renamed, &config), request);
    }
}
