//! Answer store for one in-progress attempt.

use std::collections::BTreeMap;

use crate::model::{AnswerValue, AssessmentConfig, QuestionId};

/// Mapping from question id to the learner's current answer.
///
/// Empty answers are never stored: writing one clears the entry, so every
/// stored value counts as answered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerStore {
    answers: BTreeMap<QuestionId, AnswerValue>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any prior answer to `question_id`.
    pub fn set_answer(&mut self, question_id: &str, value: AnswerValue) {
        if value.is_empty() {
            self.answers.remove(question_id);
        } else {
            self.answers.insert(question_id.to_string(), value);
        }
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }

    /// Number of questions with a non-empty answer.
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Number of required questions with a non-empty answer.
    pub fn required_answered_count(&self, config: &AssessmentConfig) -> usize {
        config
            .questions
            .iter()
            .filter(|q| config.is_required(q) && self.answers.contains_key(&q.id))
            .count()
    }

    /// Required questions that still have no answer, in display order.
    pub fn missing_required(&self, config: &AssessmentConfig) -> Vec<QuestionId> {
        config
            .questions
            .iter()
            .filter(|q| config.is_required(q) && !self.answers.contains_key(&q.id))
            .map(|q| q.id.clone())
            .collect()
    }

    /// True iff every required question has an answer.
    pub fn is_complete(&self, config: &AssessmentConfig) -> bool {
        self.missing_required(config).is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<QuestionId, AnswerValue> {
        self.answers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssessmentKind, Question, QuestionKind};

    fn config(kind: AssessmentKind) -> AssessmentConfig {
        let mut config: AssessmentConfig = serde_json::from_str(r#"{"id": "s1"}"#).unwrap();
        config.kind = kind;
        config.questions = vec![
            Question {
                id: "q1".into(),
                text: "Pick".into(),
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
                text: "Optional essay".into(),
                kind: QuestionKind::Essay {
                    correct_answer: None,
                },
                points: 1,
                explanation: None,
                required: false,
            },
        ];
        config
    }

    #[test]
    fn empty_answer_clears_entry() {
        let mut store = AnswerStore::new();
        store.set_answer("q2", AnswerValue::Text("draft".into()));
        assert_eq!(store.answered_count(), 1);
        store.set_answer("q2", AnswerValue::Text("  ".into()));
        assert_eq!(store.answered_count(), 0);
    }

    #[test]
    fn assignment_completeness_uses_required_flag() {
        let config = config(AssessmentKind::Assignment);
        let mut store = AnswerStore::new();
        assert!(!store.is_complete(&config));
        store.set_answer("q1", AnswerValue::Choice(1));
        assert!(store.is_complete(&config));
        assert_eq!(store.required_answered_count(&config), 1);
    }

    #[test]
    fn quiz_completeness_needs_all_questions() {
        let config = config(AssessmentKind::Quiz);
        let mut store = AnswerStore::new();
        store.set_answer("q1", AnswerValue::Choice(1));
        assert_eq!(store.missing_required(&config), vec!["q2".to_string()]);
        store.set_answer("q2", AnswerValue::Text("essay".into()));
        assert!(store.is_complete(&config));
    }
}
