//! Core data model types for assessor.
//!
//! These are the fundamental types the engine works over: questions,
//! assessment configuration, learner answers, attempts and the derived
//! review result.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a question within one assessment.
pub type QuestionId = String;

/// A single gradable prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the assessment.
    pub id: QuestionId,
    /// Prompt shown to the learner.
    pub text: String,
    /// Kind-specific payload (options, correct answer).
    #[serde(flatten)]
    pub kind: QuestionKind,
    /// Point value (at least 1).
    pub points: u32,
    /// Optional explanation disclosed with the correct answer.
    #[serde(default)]
    pub explanation: Option<String>,
    /// Whether the question must be answered before a manual submit.
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

/// The kind of a question together with the data only that kind carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        /// Index into `options`.
        correct_answer: usize,
    },
    ShortAnswer {
        correct_answer: String,
    },
    /// Manually graded; an optional reference answer may be disclosed.
    Essay {
        #[serde(default)]
        correct_answer: Option<String>,
    },
    FileUpload,
}

impl QuestionKind {
    /// Short machine name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::ShortAnswer { .. } => "short_answer",
            QuestionKind::Essay { .. } => "essay",
            QuestionKind::FileUpload => "file_upload",
        }
    }

    /// The correct answer for this kind, if one is defined.
    pub fn correct_answer(&self) -> Option<CorrectAnswer> {
        match self {
            QuestionKind::MultipleChoice { correct_answer, .. } => {
                Some(CorrectAnswer::Choice(*correct_answer))
            }
            QuestionKind::ShortAnswer { correct_answer } => {
                Some(CorrectAnswer::Text(correct_answer.clone()))
            }
            QuestionKind::Essay { correct_answer } => {
                correct_answer.clone().map(CorrectAnswer::Text)
            }
            QuestionKind::FileUpload => None,
        }
    }
}

/// A correct answer as disclosed in feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Choice(usize),
    Text(String),
}

impl fmt::Display for CorrectAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectAnswer::Choice(index) => write!(f, "option {index}"),
            CorrectAnswer::Text(text) => write!(f, "{text}"),
        }
    }
}

/// A reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub file_name: String,
    pub url: String,
}

/// A learner's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Selected option index.
    Choice(usize),
    /// Free text (short answer or essay).
    Text(String),
    /// Uploaded file.
    File(FileRef),
}

impl AnswerValue {
    /// Whether this answer counts as "answered".
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Choice(_) => false,
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::File(file) => file.url.trim().is_empty(),
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Choice(index) => write!(f, "option {index}"),
            AnswerValue::Text(text) => write!(f, "{text}"),
            AnswerValue::File(file) => write!(f, "{}", file.file_name),
        }
    }
}

/// Whether the assessment is a quiz or an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentKind {
    /// Every question must be answered for a manual submit.
    #[default]
    Quiz,
    /// Only questions flagged `required` must be answered.
    Assignment,
}

impl fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentKind::Quiz => write!(f, "quiz"),
            AssessmentKind::Assignment => write!(f, "assignment"),
        }
    }
}

impl FromStr for AssessmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiz" => Ok(AssessmentKind::Quiz),
            "assignment" => Ok(AssessmentKind::Assignment),
            other => Err(format!("unknown assessment kind: {other}")),
        }
    }
}

/// Maximum number of completed attempts. Serialized as `-1` for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum AttemptLimit {
    Unlimited,
    Limited(u32),
}

impl TryFrom<i64> for AttemptLimit {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(AttemptLimit::Unlimited),
            n if n >= 1 => u32::try_from(n)
                .map(AttemptLimit::Limited)
                .map_err(|_| format!("max_attempts out of range: {n}")),
            n => Err(format!("max_attempts must be -1 or at least 1, got {n}")),
        }
    }
}

impl From<AttemptLimit> for i64 {
    fn from(limit: AttemptLimit) -> Self {
        match limit {
            AttemptLimit::Unlimited => -1,
            AttemptLimit::Limited(n) => i64::from(n),
        }
    }
}

impl fmt::Display for AttemptLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptLimit::Unlimited => write!(f, "unlimited"),
            AttemptLimit::Limited(n) => write!(f, "{n}"),
        }
    }
}

/// Time allowed for one attempt. Serialized as minutes, `0` for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum TimeLimit {
    Unlimited,
    Limited { minutes: u32 },
}

impl TimeLimit {
    /// Total countdown length, `None` when unlimited.
    pub fn as_seconds(&self) -> Option<u64> {
        match self {
            TimeLimit::Unlimited => None,
            TimeLimit::Limited { minutes } => Some(u64::from(*minutes) * 60),
        }
    }
}

impl From<u32> for TimeLimit {
    fn from(minutes: u32) -> Self {
        if minutes == 0 {
            TimeLimit::Unlimited
        } else {
            TimeLimit::Limited { minutes }
        }
    }
}

impl From<TimeLimit> for u32 {
    fn from(limit: TimeLimit) -> Self {
        match limit {
            TimeLimit::Unlimited => 0,
            TimeLimit::Limited { minutes } => minutes,
        }
    }
}

/// Configuration shared by quizzes and assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Subject identifier (the question-set id).
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub kind: AssessmentKind,
    /// Questions in display order.
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(rename = "time_limit_minutes", default = "default_time_limit")]
    pub time_limit: TimeLimit,
    #[serde(default = "default_passing_score")]
    pub passing_score_percent: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: AttemptLimit,
    #[serde(default)]
    pub allow_late_submission: bool,
    /// Deducted once per day late, in percentage points. May be fractional.
    #[serde(default)]
    pub late_penalty_percent_per_day: f64,
    #[serde(default)]
    pub show_answers_after_deadline: bool,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Whether the prerequisite gate must pass before an attempt starts.
    #[serde(default)]
    pub requires_prerequisite: bool,
}

fn default_time_limit() -> TimeLimit {
    TimeLimit::Unlimited
}

fn default_passing_score() -> u32 {
    70
}

fn default_max_attempts() -> AttemptLimit {
    AttemptLimit::Unlimited
}

impl AssessmentConfig {
    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Whether `question` must be answered for a manual submit.
    pub fn is_required(&self, question: &Question) -> bool {
        match self.kind {
            AssessmentKind::Quiz => true,
            AssessmentKind::Assignment => question.required,
        }
    }

    /// Sum of all question points.
    pub fn total_points(&self) -> u64 {
        self.questions.iter().map(|q| u64::from(q.points)).sum()
    }
}

/// One learner's pass through a question set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    /// Question-set id this attempt was taken against.
    pub subject_id: String,
    pub user_id: String,
    #[serde(default)]
    pub answers: BTreeMap<QuestionId, AnswerValue>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub raw_score_percent: Option<u32>,
    #[serde(default)]
    pub final_score_percent: Option<u32>,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub is_late: bool,
    #[serde(default)]
    pub time_spent_seconds: u64,
    /// Set when the countdown submitted the attempt.
    #[serde(default)]
    pub auto_submitted: bool,
    /// Points recorded by a human grader, keyed by question id.
    #[serde(default)]
    pub manual_points: BTreeMap<QuestionId, u32>,
}

impl Attempt {
    /// Create a fresh in-progress attempt.
    pub fn new(subject_id: &str, user_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            user_id: user_id.to_string(),
            answers: BTreeMap::new(),
            started_at,
            completed_at: None,
            raw_score_percent: None,
            final_score_percent: None,
            passed: None,
            is_late: false,
            time_spent_seconds: 0,
            auto_submitted: false,
            manual_points: BTreeMap::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Feedback for one question in a reviewed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub question_id: QuestionId,
    /// `None` while a manually graded question awaits a grade.
    pub is_correct: Option<bool>,
    pub user_answer: Option<AnswerValue>,
    /// Stripped unless answers are visible.
    pub correct_answer: Option<CorrectAnswer>,
    /// Stripped unless answers are visible.
    pub explanation: Option<String>,
    pub points_earned: u32,
    pub points_possible: u32,
}

/// A graded attempt with feedback, as handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub attempt: Attempt,
    pub feedback: Vec<QuestionFeedback>,
    pub can_view_answers: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_limit_sentinels() {
        assert_eq!(AttemptLimit::try_from(-1), Ok(AttemptLimit::Unlimited));
        assert_eq!(AttemptLimit::try_from(3), Ok(AttemptLimit::Limited(3)));
        assert!(AttemptLimit::try_from(0).is_err());
        assert!(AttemptLimit::try_from(-2).is_err());
        assert_eq!(i64::from(AttemptLimit::Unlimited), -1);
    }

    #[test]
    fn time_limit_sentinels() {
        assert_eq!(TimeLimit::from(0), TimeLimit::Unlimited);
        assert_eq!(TimeLimit::from(5).as_seconds(), Some(300));
        assert_eq!(TimeLimit::Unlimited.as_seconds(), None);
    }

    #[test]
    fn answer_emptiness() {
        assert!(AnswerValue::Text("   ".into()).is_empty());
        assert!(!AnswerValue::Text("x".into()).is_empty());
        assert!(!AnswerValue::Choice(0).is_empty());
        assert!(AnswerValue::File(FileRef {
            file_name: "a.pdf".into(),
            url: String::new(),
        })
        .is_empty());
    }

    #[test]
    fn config_json_uses_boundary_sentinels() {
        let json = r#"{
            "id": "quiz-1",
            "max_attempts": -1,
            "time_limit_minutes": 0,
            "questions": [
                {"id": "q1", "text": "2+2?", "kind": "multiple_choice",
                 "options": ["3", "4"], "correct_answer": 1, "points": 2}
            ]
        }"#;
        let config: AssessmentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_attempts, AttemptLimit::Unlimited);
        assert_eq!(config.time_limit, TimeLimit::Unlimited);
        assert_eq!(config.passing_score_percent, 70);
        assert!(config.questions[0].required);
        assert_eq!(
            config.questions[0].kind.correct_answer(),
            Some(CorrectAnswer::Choice(1))
        );
    }

    #[test]
    fn invalid_attempt_sentinel_is_rejected() {
        let json = r#"{"id": "quiz-1", "max_attempts": 0}"#;
        assert!(serde_json::from_str::<AssessmentConfig>(json).is_err());
    }

    #[test]
    fn quiz_requires_every_question() {
        let question = Question {
            id: "q1".into(),
            text: "Essay".into(),
            kind: QuestionKind::Essay {
                correct_answer: None,
            },
            points: 5,
            explanation: None,
            required: false,
        };
        let mut config: AssessmentConfig =
            serde_json::from_str(r#"{"id": "s"}"#).unwrap();
        config.questions.push(question.clone());
        assert!(config.is_required(&question));
        config.kind = AssessmentKind::Assignment;
        assert!(!config.is_required(&question));
    }
}
