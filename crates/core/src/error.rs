use thiserror::Error;

/// Validation failures for quiz domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    #[error("question id must not be empty")]
    EmptyQuestionId,

    #[error("question id is too long: {len} characters (max {max})")]
    QuestionIdTooLong { len: usize, max: usize },

    #[error("invalid identifier: {raw}")]
    InvalidId { raw: String },
}
