//! Exam report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use certexam_core::model::{FinalExam, FinalExamAttempt};
use certexam_core::statistics::{attempt_breakdown, exam_summary, AttemptBreakdown, ExamSummary};

/// An exam with its attempt history and derived statistics, ready for
/// export or integrity review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamReport {
    pub created_at: DateTime<Utc>,
    pub exam: FinalExam,
    pub summary: ExamSummary,
    /// One entry per attempt, in attempt order.
    pub breakdowns: Vec<AttemptBreakdown>,
}

impl ExamReport {
    pub fn new(exam: &FinalExam, created_at: DateTime<Utc>) -> Self {
        let breakdowns = exam
            .attempts()
            .iter()
            .map(|a| attempt_breakdown(a, &exam.question_pool))
            .collect();
        Self {
            created_at,
            exam: exam.clone(),
            summary: exam_summary(exam),
            breakdowns,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

/// Write a single attempt record, as handed to progress and analytics consumers.
pub fn write_attempt_json(attempt: &FinalExamAttempt, path: &Path) -> Result<()> {
    write_json(attempt, path)
}

pub fn read_attempt_json(path: &Path) -> Result<FinalExamAttempt> {
    read_json(path)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read report from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse report JSON: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use certexam_core::levels::exam_config;
    use certexam_core::model::CertificateLevel;

    use super::*;
    use crate::testing::{attempt, exam_with_pool};

    #[test]
    fn report_round_trips_through_disk() {
        let mut exam = exam_with_pool();
        exam.record_attempt(attempt(&exam, 1, &[true, false, false], 2)).unwrap();
        exam.record_attempt(attempt(&exam, 2, &[true, true, true], 0)).unwrap();

        let report = ExamReport::new(&exam, Utc::now());
        assert_eq!(report.breakdowns.len(), 2);
        assert_eq!(report.summary.attempts, 2);
        assert_eq!(report.summary.total_tab_away, 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("exam.json");
        report.save_json(&path).unwrap();

        let loaded = ExamReport::load_json(&path).unwrap();
        assert_eq!(loaded.exam, exam);
        assert!(loaded.exam.is_passed());
        assert_eq!(loaded.exam.best_score(), Some(100));
        assert_eq!(loaded.summary, report.summary);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"bestScore\""));
        assert!(raw.contains("\"tabAwayCount\""));
    }

    #[test]
    fn attempt_json_is_camel_case() {
        let exam = certexam_core::model::FinalExam::new(
            "plan",
            exam_config(CertificateLevel::Basico),
            vec![],
            Utc::now(),
        );
        let a = attempt(&exam, 1, &[true], 0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attempt.json");
        write_attempt_json(&a, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"attemptNumber\": 1"));
        assert!(raw.contains("\"questionsUsed\""));
        assert_eq!(read_attempt_json(&path).unwrap(), a);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExamReport::load_json(&dir.path().join("missing.json")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read report"));
    }
}
