//! Attempt-history summaries and per-question statistics.

use serde::{Deserialize, Serialize};

use crate::grading::{grade, Grade};
use crate::model::{AssessmentConfig, Attempt};
use crate::policy::{attempts_remaining, completed_attempts};

/// A learner's standing on one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSummary {
    /// Completed attempts (the ones counted against the cap).
    pub attempts_used: u32,
    /// `None` when attempts are unlimited.
    pub attempts_remaining: Option<u32>,
    pub best_score_percent: Option<u32>,
    /// Final score of the most recently completed attempt.
    pub latest_score_percent: Option<u32>,
    pub average_score_percent: Option<f64>,
    pub passed_any: bool,
}

/// Summarize a learner's attempts at `config`.
pub fn summarize_attempts(config: &AssessmentConfig, attempts: &[Attempt]) -> AttemptSummary {
    let mut completed: Vec<&Attempt> = attempts.iter().filter(|a| a.is_completed()).collect();
    completed.sort_by_key(|a| a.completed_at);

    let scores: Vec<u32> = completed
        .iter()
        .filter_map(|a| a.final_score_percent)
        .collect();

    let average_score_percent = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64)
    };

    AttemptSummary {
        attempts_used: completed_attempts(attempts),
        attempts_remaining: attempts_remaining(config, attempts),
        best_score_percent: scores.iter().copied().max(),
        latest_score_percent: completed.last().and_then(|a| a.final_score_percent),
        average_score_percent,
        passed_any: completed.iter().any(|a| a.passed == Some(true)),
    }
}

/// How learners fared on one question across many attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStats {
    pub question_id: String,
    pub answered: u32,
    /// Attempts where the question earned full credit, manual grades included.
    pub correct: u32,
    /// `correct` over the attempts with a verdict on this question; `None`
    /// until at least one has one.
    pub correct_rate: Option<f64>,
}

/// Per-question answer and correctness counts over completed attempts.
///
/// Verdicts come from [`grade`], so recorded manual points count the same
/// way they do in the attempt's score.
pub fn question_stats(config: &AssessmentConfig, attempts: &[Attempt]) -> Vec<QuestionStats> {
    let completed: Vec<&Attempt> = attempts.iter().filter(|a| a.is_completed()).collect();
    let grades: Vec<Grade> = completed.iter().map(|a| grade(a, config)).collect();

    config
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let answered = completed
                .iter()
                .filter(|a| a.answers.contains_key(&question.id))
                .count() as u32;
            let verdicts: Vec<bool> = grades
                .iter()
                .filter_map(|g| g.feedback.get(index).and_then(|f| f.is_correct))
                .collect();
            let correct = verdicts.iter().filter(|&&v| v).count() as u32;
            let correct_rate = if verdicts.is_empty() {
                None
            } else {
                Some(f64::from(correct) / verdicts.len() as f64)
            };
            QuestionStats {
                question_id: question.id.clone(),
                answered,
                correct,
                correct_rate,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::record_manual_grades;
    use crate::model::{AnswerValue, AttemptLimit, Question, QuestionKind};
    use std::collections::BTreeMap;
    use chrono::{DateTime, Duration, Utc};

    fn config() -> AssessmentConfig {
        let mut config: AssessmentConfig = serde_json::from_str(r#"{"id": "s1"}"#).unwrap();
        config.max_attempts = AttemptLimit::Limited(3);
        config.questions = vec![
            Question {
                id: "q1".into(),
                text: "Pick a".into(),
                kind: QuestionKind::MultipleChoice {
                    options: vec!["a".into(), "b".into()],
                    correct_answer: 0,
                },
                points: 1,
                explanation: None,
                required: true,
            },
            Question {
                id: "q2".into(),
                text: "Upload".into(),
                kind: QuestionKind::FileUpload,
                points: 1,
                explanation: None,
                required: true,
            },
        ];
        config
    }

    fn attempt(offset_minutes: i64, score: Option<u32>, answer: Option<usize>) -> Attempt {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(offset_minutes);
        let mut a = Attempt::new("s1", "u1", start);
        if let Some(score) = score {
            a.completed_at = Some(start + Duration::minutes(1));
            a.final_score_percent = Some(score);
            a.raw_score_percent = Some(score);
            a.passed = Some(score >= 70);
        }
        if let Some(choice) = answer {
            a.answers.insert("q1".into(), AnswerValue::Choice(choice));
        }
        a
    }

    #[test]
    fn summary_of_mixed_history() {
        let attempts = vec![
            attempt(30, Some(40), Some(1)),
            attempt(0, Some(80), Some(0)),
            attempt(60, None, None),
        ];
        let summary = summarize_attempts(&config(), &attempts);
        assert_eq!(summary.attempts_used, 2);
        assert_eq!(summary.attempts_remaining, Some(1));
        assert_eq!(summary.best_score_percent, Some(80));
        assert_eq!(summary.latest_score_percent, Some(40));
        assert_eq!(summary.average_score_percent, Some(60.0));
        assert!(summary.passed_any);
    }

    #[test]
    fn summary_of_no_attempts() {
        let summary = summarize_attempts(&config(), &[]);
        assert_eq!(summary.attempts_used, 0);
        assert_eq!(summary.best_score_percent, None);
        assert_eq!(summary.average_score_percent, None);
        assert!(!summary.passed_any);
    }

    #[test]
    fn per_question_rates() {
        let attempts = vec![
            attempt(0, Some(100), Some(0)),
            attempt(10, Some(0), Some(1)),
            attempt(20, Some(0), None),
            attempt(30, Some(100), Some(0)),
        ];
        let stats = question_stats(&config(), &attempts);
        assert_eq!(stats[0].answered, 3);
        assert_eq!(stats[0].correct, 2);
        assert_eq!(stats[0].correct_rate, Some(0.5));
        assert_eq!(stats[1].correct, 0);
        assert_eq!(stats[1].correct_rate, None);
    }

    #[test]
    fn manual_grades_count_toward_correct() {
        let config = config();
        let mut graded = attempt(0, Some(0), Some(1));
        let grades = BTreeMap::from([("q1".to_string(), 1), ("q2".to_string(), 1)]);
        record_manual_grades(&mut graded, &config, &grades).unwrap();
        let ungraded = attempt(10, Some(0), None);

        let stats = question_stats(&config, &[graded, ungraded]);
        assert_eq!(stats[0].correct, 1);
        assert_eq!(stats[0].correct_rate, Some(0.5));
        // Only the graded upload has a verdict.
        assert_eq!(stats[1].correct, 1);
        assert_eq!(stats[1].correct_rate, Some(1.0));
    }
}
