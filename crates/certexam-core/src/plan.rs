//! Study plan, profile, and lesson progress as consumed by the exam engine.
//!
//! Lesson completion is tracked elsewhere; the engine only reads it through
//! [`ProgressSource`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The student a plan belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProfile {
    pub id: String,
    pub user_id: String,
    pub skill_name: String,
    pub skill_category: String,
    /// Free-form target level ("basic", "intermediate", "advanced", "expert").
    pub target_level: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonTopic {
    pub week_number: u32,
    pub lesson_number: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl LessonTopic {
    pub fn key(&self) -> LessonKey {
        LessonKey::new(self.week_number, self.lesson_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanWeek {
    pub week_number: u32,
    #[serde(default)]
    pub lesson_topics: Vec<LessonTopic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    pub id: String,
    #[serde(default)]
    pub weeks: Vec<PlanWeek>,
    #[serde(default)]
    pub total_hours: f64,
}

impl StudyPlan {
    /// Every lesson topic across every week, in plan order.
    pub fn topics(&self) -> impl Iterator<Item = &LessonTopic> {
        self.weeks.iter().flat_map(|w| w.lesson_topics.iter())
    }
}

/// Identifies a lesson within a plan by week and lesson number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LessonKey {
    pub week: u32,
    pub lesson: u32,
}

impl LessonKey {
    pub fn new(week: u32, lesson: u32) -> Self {
        Self { week, lesson }
    }
}

/// Completion state of one generated lesson.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub is_completed: bool,
    #[serde(default)]
    pub exercises_total: u32,
    #[serde(default)]
    pub exercises_completed: u32,
    /// `None` when the lesson has no quiz.
    #[serde(default)]
    pub quiz_passed: Option<bool>,
}

/// Read access to per-lesson completion state.
///
/// Returns `None` for lessons whose content was never generated; those count
/// as incomplete and contribute no exercises or quizzes.
pub trait ProgressSource {
    fn lesson(&self, key: LessonKey) -> Option<&LessonProgress>;
}

impl ProgressSource for HashMap<LessonKey, LessonProgress> {
    fn lesson(&self, key: LessonKey) -> Option<&LessonProgress> {
        self.get(&key)
    }
}
