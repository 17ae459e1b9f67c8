use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::QuestionId;

/// A single recorded answer.
///
/// The wire form is untagged so answers stay plain JSON values:
/// `"oily"`, `["acne", "redness"]`, `3`, `true`. Anything else the backend
/// holds (slider floats, `null`, objects) is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Flag(bool),
    Scale(i64),
    Choice(String),
    Choices(Vec<String>),
    Other(serde_json::Value),
}

impl Answer {
    #[must_use]
    pub fn choice(value: impl Into<String>) -> Self {
        Self::Choice(value.into())
    }

    #[must_use]
    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choices(values.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Self::Choice(value.to_owned())
    }
}

impl From<String> for Answer {
    fn from(value: String) -> Self {
        Self::Choice(value)
    }
}

impl From<i64> for Answer {
    fn from(value: i64) -> Self {
        Self::Scale(value)
    }
}

impl From<bool> for Answer {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<f64> for Answer {
    fn from(value: f64) -> Self {
        Self::Other(serde_json::Value::from(value))
    }
}

/// Answers keyed by question. Ordering carries no meaning; a sorted map keeps
/// serialized payloads stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizAnswers(BTreeMap<QuestionId, Answer>);

impl QuizAnswers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite one answer, returning the previous value.
    pub fn insert(&mut self, question: QuestionId, answer: Answer) -> Option<Answer> {
        self.0.insert(question, answer)
    }

    #[must_use]
    pub fn get(&self, question: &QuestionId) -> Option<&Answer> {
        self.0.get(question)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &Answer)> {
        self.0.iter()
    }
}

impl FromIterator<(QuestionId, Answer)> for QuizAnswers {
    fn from_iter<T: IntoIterator<Item = (QuestionId, Answer)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
