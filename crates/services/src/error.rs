//! Shared error types for the services crate.

use thiserror::Error;

use backend::{BackendError, ConfigError};

/// Errors emitted by `QuizProgressStore` and service bootstrap.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("the quiz store must be created inside a Tokio runtime")]
    NoRuntime,
    #[error("quiz is not complete")]
    NotComplete,
    #[error("no active user to autosave for")]
    NoActiveUser,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
