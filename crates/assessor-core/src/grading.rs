//! Grading engine: scores a completed attempt against its question set.
//!
//! Grading never fails. Unanswered or malformed answers count as wrong,
//! and manually graded kinds earn nothing until a grader records points.

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::model::{
    AnswerValue, AssessmentConfig, Attempt, Question, QuestionFeedback, QuestionId, QuestionKind,
};
use crate::penalty::apply_penalty;

/// Outcome of scoring an attempt, before visibility filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub raw_score_percent: u32,
    /// Sums across questions, wide enough that no question set overflows them.
    pub points_earned: u64,
    pub points_possible: u64,
    /// Unredacted per-question feedback in question order.
    pub feedback: Vec<QuestionFeedback>,
}

/// Auto-grade one answer. `None` means the kind needs a human grader.
pub fn evaluate(question: &Question, answer: Option<&AnswerValue>) -> Option<bool> {
    match &question.kind {
        QuestionKind::MultipleChoice { correct_answer, .. } => match answer {
            Some(AnswerValue::Choice(selected)) => Some(selected == correct_answer),
            _ => Some(false),
        },
        QuestionKind::ShortAnswer { correct_answer } => match answer {
            Some(AnswerValue::Text(text)) => Some(normalize(text) == normalize(correct_answer)),
            _ => Some(false),
        },
        QuestionKind::Essay { .. } | QuestionKind::FileUpload => None,
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// `round(100 * earned / possible)` with halves rounded up; 0 when nothing is possible.
pub fn percent_round_half_up(earned: u64, possible: u64) -> u32 {
    if possible == 0 {
        return 0;
    }
    let earned = u128::from(earned);
    let possible = u128::from(possible);
    let percent = (200 * earned + possible) / (2 * possible);
    u32::try_from(percent).unwrap_or(u32::MAX)
}

/// Score `attempt` against `config`.
pub fn grade(attempt: &Attempt, config: &AssessmentConfig) -> Grade {
    let mut feedback = Vec::with_capacity(config.questions.len());
    let mut points_earned = 0u64;
    let mut points_possible = 0u64;

    for question in &config.questions {
        let answer = attempt.answers.get(&question.id);

        let (is_correct, earned) = match attempt.manual_points.get(&question.id) {
            Some(&awarded) => {
                let awarded = awarded.min(question.points);
                let verdict = if awarded == question.points {
                    Some(true)
                } else if awarded == 0 {
                    Some(false)
                } else {
                    None
                };
                (verdict, awarded)
            }
            None => {
                let verdict = evaluate(question, answer);
                let earned = if verdict == Some(true) {
                    question.points
                } else {
                    0
                };
                (verdict, earned)
            }
        };

        points_earned += u64::from(earned);
        points_possible += u64::from(question.points);

        feedback.push(QuestionFeedback {
            question_id: question.id.clone(),
            is_correct,
            user_answer: answer.cloned(),
            correct_answer: question.kind.correct_answer(),
            explanation: question.explanation.clone(),
            points_earned: earned,
            points_possible: question.points,
        });
    }

    Grade {
        raw_score_percent: percent_round_half_up(points_earned, points_possible),
        points_earned,
        points_possible,
        feedback,
    }
}

/// Grade a completed attempt and write raw score, final score and verdict onto it.
///
/// `is_late` must already be frozen on the attempt.
pub fn score_attempt(attempt: &mut Attempt, config: &AssessmentConfig) -> Grade {
    let grade = grade(attempt, config);
    let final_score = apply_penalty(grade.raw_score_percent, attempt, config);
    attempt.raw_score_percent = Some(grade.raw_score_percent);
    attempt.final_score_percent = Some(final_score);
    attempt.passed = Some(final_score >= config.passing_score_percent);
    grade
}

/// Record points from a human grader and rescore the attempt.
///
/// Points are clamped to each question's value. Ids outside the question
/// set are rejected before anything is written.
pub fn record_manual_grades(
    attempt: &mut Attempt,
    config: &AssessmentConfig,
    grades: &BTreeMap<QuestionId, u32>,
) -> EngineResult<Grade> {
    if let Some(unknown) = grades.keys().find(|id| config.question(id).is_none()) {
        return Err(EngineError::UnknownQuestion(unknown.clone()));
    }

    for (question_id, &points) in grades {
        let max = config.question(question_id).map_or(0, |q| q.points);
        attempt
            .manual_points
            .insert(question_id.clone(), points.min(max));
    }

    let grade = score_attempt(attempt, config);
    tracing::info!(
        attempt_id = %attempt.id,
        graded = grades.len(),
        raw_score = grade.raw_score_percent,
        final_score = ?attempt.final_score_percent,
        "manual grades recorded"
    );
    Ok(grade)
}
