use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ModelError;

/// Upper bound on locally entered question identifiers; they are short slugs
/// like `skin_type`.
pub const MAX_QUESTION_ID_LEN: usize = 64;

/// Identifier of the account a quiz belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn value(&self) -> Uuid {
        self.0
    }
}

/// Identifier of a finalized quiz attempt, assigned by the backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(Uuid);

impl AttemptId {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> Uuid {
        self.0
    }
}

/// Key of a quiz question, e.g. `skin_type` or `q1`.
///
/// `new` validates keys entered locally. Keys read back from the backend are
/// taken verbatim so a stored autosave always loads.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct QuestionId(String);

impl QuestionId {
    /// Trim and validate a question key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::EmptyQuestionId` for blank input and
    /// `ModelError::QuestionIdTooLong` past `MAX_QUESTION_ID_LEN` characters.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ModelError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyQuestionId);
        }
        let len = trimmed.chars().count();
        if len > MAX_QUESTION_ID_LEN {
            return Err(ModelError::QuestionIdTooLong {
                len,
                max: MAX_QUESTION_ID_LEN,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for QuestionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self)
    }
}

impl From<QuestionId> for String {
    fn from(value: QuestionId) -> Self {
        value.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Debug for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttemptId({})", self.0)
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({:?})", self.0)
    }
}

// ─── Display / FromStr ─────────────────────────────────────────────────────────

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ModelError::InvalidId { raw: s.to_owned() })
    }
}

impl FromStr for AttemptId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ModelError::InvalidId { raw: s.to_owned() })
    }
}

impl FromStr for QuestionId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_id_is_trimmed_and_validated() {
        let id = QuestionId::new("  skin_type ").unwrap();
        assert_eq!(id.as_str(), "skin_type");

        assert_eq!(QuestionId::new("   "), Err(ModelError::EmptyQuestionId));

        let long = "q".repeat(MAX_QUESTION_ID_LEN + 1);
        assert!(matches!(
            QuestionId::new(long),
            Err(ModelError::QuestionIdTooLong { len: 65, max: 64 })
        ));
    }

    #[test]
    fn question_id_from_backend_is_kept_verbatim() {
        let long = "k".repeat(MAX_QUESTION_ID_LEN + 10);
        let id: QuestionId = serde_json::from_value(serde_json::json!(long)).unwrap();
        assert_eq!(id.as_str(), long);

        let padded: QuestionId = serde_json::from_str("\" q1 \"").unwrap();
        assert_eq!(padded.as_str(), " q1 ");
    }

    #[test]
    fn user_id_parses_uuid_text() {
        let raw = "7f1c2a34-5b6d-4e8f-9a0b-1c2d3e4f5a6b";
        let id: UserId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }
}
