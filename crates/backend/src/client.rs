use async_trait::async_trait;
use quiz_core::model::{
    AttemptId, AttemptRecord, AutosaveRecord, NewAttempt, QuizSnapshot, UserId,
};
use std::fmt;
use thiserror::Error;

/// Normalized failure from any backend call.
///
/// Transport faults, non-success statuses and unreadable bodies all end up
/// here, so callers only ever see `Ok(data)` or one of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{message}")]
    Api {
        message: String,
        code: Option<String>,
    },
}

impl BackendError {
    #[must_use]
    pub fn api(message: impl Into<String>, code: Option<&str>) -> Self {
        Self::Api {
            message: message.into(),
            code: code.map(str::to_owned),
        }
    }

    /// Human readable message suitable for the UI error field.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            BackendError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            BackendError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Malformed(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// The logical operations the quiz client relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    UpsertAutosave,
    FetchAutosave,
    DeleteAutosave,
    SaveAttempt,
    ListAttempts,
    FetchAttempt,
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendOp::UpsertAutosave => "autosave upsert",
            BackendOp::FetchAutosave => "autosave fetch",
            BackendOp::DeleteAutosave => "autosave delete",
            BackendOp::SaveAttempt => "attempt save",
            BackendOp::ListAttempts => "attempt history",
            BackendOp::FetchAttempt => "attempt fetch",
        };
        f.write_str(name)
    }
}

/// Remote quiz API used by the progress store.
#[async_trait]
pub trait QuizBackendClient: Send + Sync {
    /// Create or replace the in-progress copy for a user.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the request or the backend fails.
    async fn upsert_autosave(
        &self,
        user_id: UserId,
        snapshot: &QuizSnapshot,
    ) -> Result<(), BackendError>;

    /// Fetch the in-progress copy, `None` when the user has none.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the request or the backend fails.
    async fn fetch_autosave(&self, user_id: UserId) -> Result<Option<AutosaveRecord>, BackendError>;

    /// Drop the in-progress copy.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the request or the backend fails.
    async fn delete_autosave(&self, user_id: UserId) -> Result<(), BackendError>;

    /// Store a finalized attempt.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the request or the backend fails.
    async fn save_attempt(&self, attempt: &NewAttempt) -> Result<AttemptRecord, BackendError>;

    /// Most recent attempts first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the request or the backend fails.
    async fn list_attempts(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, BackendError>;

    /// # Errors
    ///
    /// Returns `BackendError` when the attempt is missing or the request fails.
    async fn fetch_attempt(&self, attempt_id: AttemptId) -> Result<AttemptRecord, BackendError>;
}
