//! Static per-level tables: certificate descriptions, exam configs, rewards.

use serde::Serialize;

use crate::model::{CertificateLevel, DifficultyDistribution, FinalExamConfig};

/// What a certificate level requires and what it attests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateLevelDescription {
    pub level: CertificateLevel,
    pub label: &'static str,
    pub description: &'static str,
    pub what_it_attests: &'static [&'static str],
    pub minimum_exercises: u32,
    pub final_exam_questions: u32,
    pub passing_score: u32,
}

pub static CERTIFICATE_LEVELS: [CertificateLevelDescription; 3] = [
    CertificateLevelDescription {
        level: CertificateLevel::Basico,
        label: "Basico",
        description: "Fundamentals and essential concepts",
        what_it_attests: &[
            "Understanding of the fundamental concepts",
            "Ability to carry out simple tasks",
            "Familiarity with the field's terminology",
        ],
        minimum_exercises: 10,
        final_exam_questions: 15,
        passing_score: 80,
    },
    CertificateLevelDescription {
        level: CertificateLevel::Intermediario,
        label: "Intermediario",
        description: "Practical application and problem solving",
        what_it_attests: &[
            "Ability to apply knowledge in real situations",
            "Solving problems of moderate complexity",
            "Understanding of good practices and patterns",
            "Autonomy for day-to-day work",
        ],
        minimum_exercises: 20,
        final_exam_questions: 20,
        passing_score: 82,
    },
    CertificateLevelDescription {
        level: CertificateLevel::Avancado,
        label: "Avancado",
        description: "Technical mastery and critical thinking",
        what_it_attests: &[
            "Advanced command of concepts and techniques",
            "Ability to solve complex problems",
            "Critical thinking and decision making",
            "Ability to optimize and improve processes",
            "Ability to teach the concepts to others",
        ],
        minimum_exercises: 30,
        final_exam_questions: 25,
        passing_score: 85,
    },
];

/// Look up the description row for a level.
pub fn describe(level: CertificateLevel) -> &'static CertificateLevelDescription {
    match level {
        CertificateLevel::Basico => &CERTIFICATE_LEVELS[0],
        CertificateLevel::Intermediario => &CERTIFICATE_LEVELS[1],
        CertificateLevel::Avancado => &CERTIFICATE_LEVELS[2],
    }
}

/// Built-in final exam parameters for a level.
pub fn exam_config(level: CertificateLevel) -> FinalExamConfig {
    match level {
        CertificateLevel::Basico => FinalExamConfig {
            level,
            total_questions: 30,
            questions_per_attempt: 15,
            passing_score: 80,
            max_time_minutes: 30,
            min_time_per_question: 15,
            max_time_per_question: 120,
            retry_wait_hours: 24,
            difficulty_distribution: DifficultyDistribution {
                easy: 40,
                medium: 40,
                hard: 20,
            },
        },
        CertificateLevel::Intermediario => FinalExamConfig {
            level,
            total_questions: 35,
            questions_per_attempt: 20,
            passing_score: 82,
            max_time_minutes: 45,
            min_time_per_question: 20,
            max_time_per_question: 150,
            retry_wait_hours: 24,
            difficulty_distribution: DifficultyDistribution {
                easy: 25,
                medium: 45,
                hard: 30,
            },
        },
        CertificateLevel::Avancado => FinalExamConfig {
            level,
            total_questions: 40,
            questions_per_attempt: 25,
            passing_score: 85,
            max_time_minutes: 60,
            min_time_per_question: 20,
            max_time_per_question: 180,
            retry_wait_hours: 48,
            difficulty_distribution: DifficultyDistribution {
                easy: 15,
                medium: 40,
                hard: 45,
            },
        },
    }
}

/// XP awarded the first time the final exam is passed.
pub fn final_exam_xp_reward(level: CertificateLevel) -> u32 {
    match level {
        CertificateLevel::Basico => 200,
        CertificateLevel::Intermediario => 350,
        CertificateLevel::Avancado => 500,
    }
}

/// XP awarded when a lesson quiz is passed.
pub const QUIZ_PASSED_XP: u32 = 35;

/// Disclaimer the student must acknowledge before a diploma is issued.
pub const LEGAL_DISCLAIMER_TEXT: &str = "This certificate attests completion of a self-directed, \
AI-assisted study program. It is not a degree, technical diploma, or any qualification regulated \
by an official education body, and it does not license the holder to practise a regulated \
profession. The knowledge attested refers only to the course content, generated and assessed by \
artificial intelligence without supervision from an accredited institution. The certificate is \
informational and intended for personal development only.";
