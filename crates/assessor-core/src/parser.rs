//! TOML assessment parser.
//!
//! Loads assessment definitions from TOML files and directories, and
//! validates them against the authoring rules.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{AssessmentConfig, AssessmentKind, AttemptLimit, Question, QuestionKind, TimeLimit};

/// Intermediate TOML structure for parsing assessment files.
#[derive(Debug, Deserialize)]
struct TomlAssessmentFile {
    assessment: TomlAssessmentHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlAssessmentHeader {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default = "default_kind_str")]
    kind: String,
    #[serde(default)]
    time_limit_minutes: u32,
    #[serde(default = "default_passing_score")]
    passing_score_percent: u32,
    #[serde(default = "default_max_attempts")]
    max_attempts: i64,
    #[serde(default)]
    allow_late_submission: bool,
    #[serde(default)]
    late_penalty_percent_per_day: f64,
    #[serde(default)]
    show_answers_after_deadline: bool,
    /// RFC 3339 timestamp, e.g. "2024-01-10T00:00:00Z".
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    requires_prerequisite: bool,
}

fn default_kind_str() -> String {
    "quiz".to_string()
}

fn default_passing_score() -> u32 {
    70
}

fn default_max_attempts() -> i64 {
    -1
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    text: String,
    kind: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answer: Option<toml::Value>,
    #[serde(default = "default_points")]
    points: u32,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default = "default_true")]
    required: bool,
}

fn default_points() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl TomlQuestion {
    fn into_question(self) -> Result<Question> {
        let id = self.id;
        let kind = match self.kind.as_str() {
            "multiple_choice" => {
                let index = self
                    .correct_answer
                    .as_ref()
                    .and_then(toml::Value::as_integer)
                    .with_context(|| {
                        format!("question '{id}': multiple_choice needs an integer correct_answer")
                    })?;
                let correct_answer = usize::try_from(index).with_context(|| {
                    format!("question '{id}': correct_answer must not be negative")
                })?;
                QuestionKind::MultipleChoice {
                    options: self.options,
                    correct_answer,
                }
            }
            "short_answer" => {
                let correct_answer = self
                    .correct_answer
                    .as_ref()
                    .and_then(toml::Value::as_str)
                    .with_context(|| {
                        format!("question '{id}': short_answer needs a string correct_answer")
                    })?
                    .to_string();
                QuestionKind::ShortAnswer { correct_answer }
            }
            "essay" => QuestionKind::Essay {
                correct_answer: self
                    .correct_answer
                    .as_ref()
                    .and_then(toml::Value::as_str)
                    .map(str::to_string),
            },
            "file_upload" => QuestionKind::FileUpload,
            other => anyhow::bail!("question '{id}': unknown question kind: {other}"),
        };

        Ok(Question {
            id,
            text: self.text,
            kind,
            points: self.points,
            explanation: self.explanation,
            required: self.required,
        })
    }
}

/// Parse a single TOML file into an `AssessmentConfig`.
pub fn parse_assessment(path: &Path) -> Result<AssessmentConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read assessment file: {}", path.display()))?;

    parse_assessment_str(&content, path)
}

/// Parse a TOML string into an `AssessmentConfig` (useful for testing).
pub fn parse_assessment_str(content: &str, source_path: &Path) -> Result<AssessmentConfig> {
    let parsed: TomlAssessmentFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let header = parsed.assessment;
    let kind: AssessmentKind = header
        .kind
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;
    let max_attempts =
        AttemptLimit::try_from(header.max_attempts).map_err(|e| anyhow::anyhow!("{}", e))?;
    let due_date = header
        .due_date
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|d| d.with_timezone(&Utc))
                .with_context(|| format!("invalid due_date: {s}"))
        })
        .transpose()?;

    let questions = parsed
        .questions
        .into_iter()
        .map(TomlQuestion::into_question)
        .collect::<Result<Vec<_>>>()?;

    Ok(AssessmentConfig {
        id: header.id,
        title: header.title,
        kind,
        questions,
        time_limit: TimeLimit::from(header.time_limit_minutes),
        passing_score_percent: header.passing_score_percent,
        max_attempts,
        allow_late_submission: header.allow_late_submission,
        late_penalty_percent_per_day: header.late_penalty_percent_per_day,
        show_answers_after_deadline: header.show_answers_after_deadline,
        due_date,
        requires_prerequisite: header.requires_prerequisite,
    })
}

/// Recursively load all `.toml` assessment files from a directory.
pub fn load_assessment_directory(dir: &Path) -> Result<Vec<AssessmentConfig>> {
    let mut configs = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            configs.extend(load_assessment_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_assessment(&path) {
                Ok(config) => configs.push(config),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(configs)
}

/// A warning from assessment validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn question(id: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate an assessment against the authoring rules.
pub fn validate_assessment(config: &AssessmentConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if config.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "assessment has no questions".into(),
        });
    }

    if config.passing_score_percent > 100 {
        warnings.push(ValidationWarning {
            question_id: None,
            message: format!(
                "passing_score_percent is {} but scores never exceed 100",
                config.passing_score_percent
            ),
        });
    }

    let rate = config.late_penalty_percent_per_day;
    if !rate.is_finite() || rate < 0.0 {
        warnings.push(ValidationWarning {
            question_id: None,
            message: format!(
                "late_penalty_percent_per_day is {rate} but must be a non-negative number"
            ),
        });
    }

    let mut seen_ids = HashSet::new();
    for question in &config.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning::question(
                &question.id,
                format!("duplicate question ID: {}", question.id),
            ));
        }

        if question.text.trim().is_empty() {
            warnings.push(ValidationWarning::question(&question.id, "text is empty"));
        }

        if question.points == 0 {
            warnings.push(ValidationWarning::question(
                &question.id,
                "points must be at least 1",
            ));
        }

        match &question.kind {
            QuestionKind::MultipleChoice {
                options,
                correct_answer,
            } => {
                let non_empty = options.iter().filter(|o| !o.trim().is_empty()).count();
                if non_empty < options.len() {
                    warnings.push(ValidationWarning::question(
                        &question.id,
                        "multiple_choice options must not be empty",
                    ));
                }
                if options.len() < 2 {
                    warnings.push(ValidationWarning::question(
                        &question.id,
                        "multiple_choice needs at least 2 options",
                    ));
                }
                if *correct_answer >= options.len() {
                    warnings.push(ValidationWarning::question(
                        &question.id,
                        format!(
                            "correct_answer {correct_answer} is out of range for {} options",
                            options.len()
                        ),
                    ));
                }
            }
            QuestionKind::ShortAnswer { correct_answer } => {
                if correct_answer.trim().is_empty() {
                    warnings.push(ValidationWarning::question(
                        &question.id,
                        "short_answer correct_answer is empty",
                    ));
                }
            }
            QuestionKind::Essay { .. } | QuestionKind::FileUpload => {}
        }
    }

    warnings
}
