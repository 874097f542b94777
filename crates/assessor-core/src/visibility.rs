//! Visibility gate for correct answers and explanations.

use chrono::{DateTime, Utc};

use crate::model::{AssessmentConfig, QuestionFeedback};

/// Answers are disclosed only after the due date, and only when configured.
pub fn can_view_answers(config: &AssessmentConfig, now: DateTime<Utc>) -> bool {
    config.show_answers_after_deadline && config.due_date.is_some_and(|due| now > due)
}

/// Strip answers and explanations unless `visible`.
pub fn filter_feedback(feedback: Vec<QuestionFeedback>, visible: bool) -> Vec<QuestionFeedback> {
    if visible {
        return feedback;
    }
    feedback
        .into_iter()
        .map(|entry| QuestionFeedback {
            correct_answer: None,
            explanation: None,
            ..entry
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CorrectAnswer;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn entry() -> QuestionFeedback {
        QuestionFeedback {
            question_id: "q1".into(),
            is_correct: Some(false),
            user_answer: None,
            correct_answer: Some(CorrectAnswer::Choice(1)),
            explanation: Some("secret".into()),
            points_earned: 0,
            points_possible: 2,
        }
    }

    #[test]
    fn gate_requires_flag_and_deadline() {
        let mut config: AssessmentConfig = serde_json::from_str(r#"{"id": "s1"}"#).unwrap();
        let after = at("2024-02-01T00:00:00Z");
        assert!(!can_view_answers(&config, after));

        config.show_answers_after_deadline = true;
        assert!(!can_view_answers(&config, after), "no due date");

        config.due_date = Some(at("2024-01-10T00:00:00Z"));
        assert!(can_view_answers(&config, after));
        assert!(!can_view_answers(&config, at("2024-01-10T00:00:00Z")));
    }

    #[test]
    fn hidden_feedback_is_redacted() {
        let filtered = filter_feedback(vec![entry(), entry()], false);
        assert!(filtered
            .iter()
            .all(|f| f.correct_answer.is_none() && f.explanation.is_none()));
        assert_eq!(filtered[0].points_possible, 2);
    }

    #[test]
    fn visible_feedback_is_untouched() {
        let filtered = filter_feedback(vec![entry()], true);
        assert_eq!(filtered[0], entry());
    }
}
