//! Question pool files.
//!
//! Hand-written pools are TOML; persisted pools are the camelCase JSON
//! produced by serializing `Vec<FinalExamQuestion>`. Both load into the same
//! model and can be checked with [`validate_pool`].

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use uuid::Uuid;

use crate::model::{Difficulty, FinalExamConfig, FinalExamQuestion, QuestionType};
use crate::selection::difficulty_quota;

#[derive(Debug, Deserialize)]
struct TomlPoolFile {
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    #[serde(default)]
    id: Option<String>,
    question: String,
    #[serde(rename = "type")]
    question_type: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    correct_answer: Option<String>,
    #[serde(default)]
    correct_answers: Option<Vec<String>>,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    code_context: Option<String>,
    #[serde(default)]
    topic: String,
}

/// Parse a TOML pool (useful for testing).
pub fn parse_pool_str(content: &str, source_path: &Path) -> Result<Vec<FinalExamQuestion>> {
    let parsed: TomlPoolFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    parsed
        .questions
        .into_iter()
        .map(|q| {
            let question_type: QuestionType = q
                .question_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!("{}", e))?;
            let difficulty = q
                .difficulty
                .map(|d| d.parse().map_err(|e: String| anyhow::anyhow!("{}", e)))
                .transpose()?
                .unwrap_or(Difficulty::Medium);
            Ok(FinalExamQuestion {
                id: q.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                question: q.question,
                question_type,
                difficulty,
                options: q.options,
                correct_answer: q.correct_answer,
                correct_answers: q.correct_answers,
                explanation: q.explanation,
                code_context: q.code_context,
                topic: q.topic,
                min_time_seconds: 0,
                max_time_seconds: 0,
            })
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid question in {}", source_path.display()))
}

/// Load a pool file; `.json` is read as persisted JSON, anything else as TOML.
pub fn load_pool(path: &Path) -> Result<Vec<FinalExamQuestion>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pool file: {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON: {}", path.display()))
    } else {
        parse_pool_str(&content, path)
    }
}

/// Recursively load every `.toml` and `.json` pool under `dir` into one pool.
///
/// Unreadable files are skipped with a warning.
pub fn load_pool_directory(dir: &Path) -> Result<Vec<FinalExamQuestion>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut questions = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            questions.extend(load_pool_directory(&path)?);
        } else if path
            .extension()
            .is_some_and(|ext| ext == "toml" || ext == "json")
        {
            match load_pool(&path) {
                Ok(pool) => questions.extend(pool),
                Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
            }
        }
    }
    Ok(questions)
}

/// A warning from pool validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub question_id: Option<String>,
    pub message: String,
}

impl ValidationWarning {
    fn question(id: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(id.to_string()),
            message: message.into(),
        }
    }

    fn pool(message: impl Into<String>) -> Self {
        Self {
            question_id: None,
            message: message.into(),
        }
    }
}

/// Check a pool for problems that would make attempts unfair or unscorable.
pub fn validate_pool(
    pool: &[FinalExamQuestion],
    config: &FinalExamConfig,
) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for q in pool {
        if !seen.insert(q.id.as_str()) {
            warnings.push(ValidationWarning::question(
                &q.id,
                format!("duplicate question ID: {}", q.id),
            ));
        }
    }

    for q in pool {
        if !q.is_scorable() {
            warnings.push(ValidationWarning::question(&q.id, "question cannot be scored"));
            continue;
        }
        let Some(options) = &q.options else {
            continue;
        };
        let offered = |answer: &str| options.iter().any(|o| o == answer);
        match q.question_type {
            QuestionType::MultipleSelect => {
                for answer in q.correct_answers.iter().flatten() {
                    if !offered(answer.as_str()) {
                        warnings.push(ValidationWarning::question(
                            &q.id,
                            format!("correct answer {answer:?} is not among the options"),
                        ));
                    }
                }
            }
            QuestionType::FillBlank => {}
            _ => {
                if let Some(answer) = &q.correct_answer {
                    if !offered(answer.as_str()) {
                        warnings.push(ValidationWarning::question(
                            &q.id,
                            format!("correct answer {answer:?} is not among the options"),
                        ));
                    }
                }
            }
        }
    }

    let per_attempt = config.questions_per_attempt as usize;
    if pool.len() < per_attempt {
        warnings.push(ValidationWarning::pool(format!(
            "pool has {} questions, each attempt draws {per_attempt}",
            pool.len()
        )));
    }

    for (difficulty, quota) in difficulty_quota(per_attempt, config) {
        let available = pool.iter().filter(|q| q.difficulty == difficulty).count();
        if available < quota {
            warnings.push(ValidationWarning::pool(format!(
                "only {available} {difficulty} questions for a quota of {quota}"
            )));
        }
    }

    warnings
}
