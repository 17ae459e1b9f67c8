use serde::{Deserialize, Serialize};

use crate::model::{Answer, QuestionId, QuizAnswers};

/// Outcome of a completed quiz. The shape is owned by the analysis backend,
/// so it is carried as raw JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizResults(serde_json::Value);

impl QuizResults {
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

/// The in-progress part of a quiz as sent to and read from autosave.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSnapshot {
    pub current_step: u32,
    #[serde(default)]
    pub answers: QuizAnswers,
}

/// Quiz progress held by the client.
///
/// Completion and results are one field, so `results()` is `Some` exactly
/// when `is_complete()` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizSession {
    current_step: u32,
    answers: QuizAnswers,
    results: Option<QuizResults>,
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    #[must_use]
    pub fn answers(&self) -> &QuizAnswers {
        &self.answers
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.results.is_some()
    }

    #[must_use]
    pub fn results(&self) -> Option<&QuizResults> {
        self.results.as_ref()
    }

    #[must_use]
    pub fn snapshot(&self) -> QuizSnapshot {
        QuizSnapshot {
            current_step: self.current_step,
            answers: self.answers.clone(),
        }
    }

    pub fn set_current_step(&mut self, step: u32) {
        self.current_step = step;
    }

    pub fn set_answer(&mut self, question: QuestionId, answer: Answer) {
        self.answers.insert(question, answer);
    }

    pub fn replace_answers(&mut self, answers: QuizAnswers) {
        self.answers = answers;
    }

    /// Overwrite step and answers from a restored snapshot.
    pub fn restore(&mut self, snapshot: QuizSnapshot) {
        self.current_step = snapshot.current_step;
        self.answers = snapshot.answers;
    }

    pub fn complete(&mut self, results: QuizResults) {
        self.results = Some(results);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_uses_camel_case_wire_names() {
        let mut session = QuizSession::new();
        session.set_current_step(2);
        session.set_answer(QuestionId::new("q1").unwrap(), "dry".into());

        let wire = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(wire, json!({ "currentStep": 2, "answers": { "q1": "dry" } }));
    }

    #[test]
    fn completion_and_results_move_together() {
        let mut session = QuizSession::new();
        assert!(!session.is_complete());
        assert!(session.results().is_none());

        session.complete(QuizResults::new(json!({ "routine": "gentle" })));
        assert!(session.is_complete());
        assert!(session.results().is_some());

        session.reset();
        assert_eq!(session, QuizSession::default());
    }
}
