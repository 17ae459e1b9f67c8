use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AttemptId, QuizResults, QuizSnapshot, UserId};

/// Payload for finalizing a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttempt {
    pub user_id: UserId,
    pub quiz_data: QuizSnapshot,
    pub results: QuizResults,
    pub has_image_analysis: bool,
}

/// A finalized quiz as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: AttemptId,
    pub user_id: UserId,
    pub quiz_data: QuizSnapshot,
    pub results: QuizResults,
    #[serde(default)]
    pub has_image_analysis: bool,
    pub created_at: DateTime<Utc>,
}

impl AttemptRecord {
    #[must_use]
    pub fn from_new(id: AttemptId, attempt: NewAttempt, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: attempt.user_id,
            quiz_data: attempt.quiz_data,
            results: attempt.results,
            has_image_analysis: attempt.has_image_analysis,
            created_at,
        }
    }
}
