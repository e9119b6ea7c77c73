//! Course completion diplomas.

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::eligibility::ProgressSnapshot;
use crate::error::IssueError;
use crate::model::{CertificateLevel, FinalExam};
use crate::plan::{StudyPlan, StudyProfile};

pub const DEFAULT_DIPLOMA_PREFIX: &str = "MELA";
pub const FALLBACK_STUDENT_NAME: &str = "Aluno";

/// `{prefix}-{year}-XXXX-YYYY`, two groups of uppercase hex.
pub fn generate_diploma_id<R: Rng + ?Sized>(
    prefix: &str,
    issued_at: DateTime<Utc>,
    rng: &mut R,
) -> String {
    let a: u16 = rng.gen();
    let b: u16 = rng.gen();
    format!("{prefix}-{}-{a:04X}-{b:04X}", issued_at.year())
}

/// An issued diploma. Immutable: fields are only readable, and a record
/// without an acknowledged disclaimer cannot be built or deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DiplomaRecord")]
pub struct CourseDiploma {
    id: String,
    plan_id: String,
    user_id: String,
    student_name: String,
    skill_name: String,
    skill_category: String,
    certificate_level: CertificateLevel,
    final_exam_score: u32,
    total_hours_studied: f64,
    lessons_completed: u32,
    exercises_completed: u32,
    issued_at: DateTime<Utc>,
    legal_disclaimer_acknowledged: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiplomaRecord {
    id: String,
    plan_id: String,
    user_id: String,
    student_name: String,
    skill_name: String,
    skill_category: String,
    certificate_level: CertificateLevel,
    final_exam_score: u32,
    total_hours_studied: f64,
    lessons_completed: u32,
    exercises_completed: u32,
    issued_at: DateTime<Utc>,
    legal_disclaimer_acknowledged: bool,
}

impl TryFrom<DiplomaRecord> for CourseDiploma {
    type Error = IssueError;

    fn try_from(r: DiplomaRecord) -> Result<Self, Self::Error> {
        if !r.legal_disclaimer_acknowledged {
            return Err(IssueError::DisclaimerNotAcknowledged);
        }
        Ok(Self {
            id: r.id,
            plan_id: r.plan_id,
            user_id: r.user_id,
            student_name: r.student_name,
            skill_name: r.skill_name,
            skill_category: r.skill_category,
            certificate_level: r.certificate_level,
            final_exam_score: r.final_exam_score,
            total_hours_studied: r.total_hours_studied,
            lessons_completed: r.lessons_completed,
            exercises_completed: r.exercises_completed,
            issued_at: r.issued_at,
            legal_disclaimer_acknowledged: true,
        })
    }
}

impl CourseDiploma {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn skill_name(&self) -> &str {
        &self.skill_name
    }

    pub fn skill_category(&self) -> &str {
        &self.skill_category
    }

    pub fn certificate_level(&self) -> CertificateLevel {
        self.certificate_level
    }

    pub fn final_exam_score(&self) -> u32 {
        self.final_exam_score
    }

    pub fn total_hours_studied(&self) -> f64 {
        self.total_hours_studied
    }

    pub fn lessons_completed(&self) -> u32 {
        self.lessons_completed
    }

    pub fn exercises_completed(&self) -> u32 {
        self.exercises_completed
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn legal_disclaimer_acknowledged(&self) -> bool {
        self.legal_disclaimer_acknowledged
    }
}

/// Everything the issuer looks at.
#[derive(Debug, Clone, Copy)]
pub struct IssueRequest<'a> {
    pub plan: Option<&'a StudyPlan>,
    pub profile: Option<&'a StudyProfile>,
    pub exam: Option<&'a FinalExam>,
    pub level: CertificateLevel,
    pub progress: &'a ProgressSnapshot,
    /// Name supplied by the host, preferred over the profile's display name.
    pub student_name: Option<&'a str>,
    /// Consent obtained out of band; must be explicitly `true`.
    pub disclaimer_acknowledged: bool,
}

/// Produces diplomas. Does not deduplicate: callers track what was issued.
#[derive(Debug, Clone)]
pub struct DiplomaIssuer {
    prefix: String,
}

impl Default for DiplomaIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_DIPLOMA_PREFIX)
    }
}

impl DiplomaIssuer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn issue<R: Rng + ?Sized>(
        &self,
        request: IssueRequest<'_>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<CourseDiploma, IssueError> {
        if !request.disclaimer_acknowledged {
            return Err(IssueError::DisclaimerNotAcknowledged);
        }
        let plan = request.plan.ok_or(IssueError::MissingPlan)?;
        let profile = request.profile.ok_or(IssueError::MissingProfile)?;
        let exam = request
            .exam
            .filter(|e| e.is_passed())
            .ok_or(IssueError::ExamNotPassed)?;

        let student_name = request
            .student_name
            .or(profile.display_name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_STUDENT_NAME)
            .to_string();

        let diploma = CourseDiploma {
            id: generate_diploma_id(&self.prefix, now, rng),
            plan_id: plan.id.clone(),
            user_id: profile.user_id.clone(),
            student_name,
            skill_name: profile.skill_name.clone(),
            skill_category: profile.skill_category.clone(),
            certificate_level: request.level,
            final_exam_score: exam.best_score().unwrap_or(0),
            total_hours_studied: plan.total_hours,
            lessons_completed: request.progress.lessons_completed,
            exercises_completed: request.progress.exercises_completed,
            issued_at: now,
            legal_disclaimer_acknowledged: true,
        };
        tracing::info!(
            diploma_id = %diploma.id,
            plan_id = %diploma.plan_id,
            level = %diploma.certificate_level,
            "issued course diploma"
        );
        Ok(diploma)
    }
}
