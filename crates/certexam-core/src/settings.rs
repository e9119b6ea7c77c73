//! Engine settings and their loader.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::diploma::DEFAULT_DIPLOMA_PREFIX;
use crate::error::ExamError;
use crate::levels::exam_config;
use crate::model::{CertificateLevel, DifficultyDistribution, FinalExamConfig};

/// Per-level adjustments to the built-in exam configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelOverride {
    pub total_questions: Option<u32>,
    pub questions_per_attempt: Option<u32>,
    pub passing_score: Option<u32>,
    pub max_time_minutes: Option<u32>,
    pub min_time_per_question: Option<u32>,
    pub max_time_per_question: Option<u32>,
    pub retry_wait_hours: Option<u32>,
    pub difficulty_distribution: Option<DifficultyDistribution>,
}

impl LevelOverride {
    fn apply(&self, config: &mut FinalExamConfig) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field {
                    config.$field = v;
                })*
            };
        }
        set!(
            total_questions,
            questions_per_attempt,
            passing_score,
            max_time_minutes,
            min_time_per_question,
            max_time_per_question,
            retry_wait_hours,
            difficulty_distribution
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelOverrides {
    #[serde(default)]
    pub basico: Option<LevelOverride>,
    #[serde(default)]
    pub intermediario: Option<LevelOverride>,
    #[serde(default)]
    pub avancado: Option<LevelOverride>,
}

impl LevelOverrides {
    pub fn get(&self, level: CertificateLevel) -> Option<&LevelOverride> {
        match level {
            CertificateLevel::Basico => self.basico.as_ref(),
            CertificateLevel::Intermediario => self.intermediario.as_ref(),
            CertificateLevel::Avancado => self.avancado.as_ref(),
        }
    }
}

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Retries on transient generation failures.
    #[serde(default = "default_retries")]
    pub generation_max_retries: u32,
    /// Initial backoff between generation retries, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub generation_retry_delay_ms: u64,
    /// Timer sampling interval for the session driver.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// XP awarded per correctly answered exam question.
    #[serde(default = "default_question_xp")]
    pub question_correct_xp: u32,
    #[serde(default = "default_prefix")]
    pub diploma_id_prefix: String,
    #[serde(default)]
    pub levels: LevelOverrides,
}

fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_question_xp() -> u32 {
    10
}
fn default_prefix() -> String {
    DEFAULT_DIPLOMA_PREFIX.to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            generation_max_retries: default_retries(),
            generation_retry_delay_ms: default_retry_delay(),
            tick_interval_ms: default_tick_interval(),
            question_correct_xp: default_question_xp(),
            diploma_id_prefix: default_prefix(),
            levels: LevelOverrides::default(),
        }
    }
}

impl EngineSettings {
    /// Timer sampling interval for the session driver.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Built-in configuration for `level` with any overrides applied, validated.
    pub fn exam_config(&self, level: CertificateLevel) -> Result<FinalExamConfig, ExamError> {
        let mut config = exam_config(level);
        if let Some(over) = self.levels.get(level) {
            over.apply(&mut config);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Load settings from well-known paths.
///
/// Search order:
/// 1. `certexam.toml` in the current directory
/// 2. `~/.config/certexam/config.toml`
///
/// Environment variable overrides: `CERTEXAM_TICK_INTERVAL_MS`, `CERTEXAM_DIPLOMA_PREFIX`.
pub fn load_settings() -> Result<EngineSettings> {
    load_settings_from(None)
}

/// Load settings from an explicit path, or search the default locations.
pub fn load_settings_from(path: Option<&Path>) -> Result<EngineSettings> {
    let settings_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("settings file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("certexam.toml");
        if local.exists() {
            Some(local)
        } else {
            config_dir()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut settings = match settings_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loading engine settings");
            toml::from_str::<EngineSettings>(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?
        }
        None => EngineSettings::default(),
    };

    if let Ok(raw) = std::env::var("CERTEXAM_TICK_INTERVAL_MS") {
        settings.tick_interval_ms = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid CERTEXAM_TICK_INTERVAL_MS: {raw}"))?;
    }
    if let Ok(prefix) = std::env::var("CERTEXAM_DIPLOMA_PREFIX") {
        if !prefix.trim().is_empty() {
            settings.diploma_id_prefix = prefix.trim().to_string();
        }
    }
    if settings.tick_interval_ms == 0 {
        anyhow::bail!("tick_interval_ms must be greater than zero");
    }

    Ok(settings)
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("certexam"))
}
