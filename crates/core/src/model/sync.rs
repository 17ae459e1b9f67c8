use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::QuizSnapshot;

/// Where the autosave flow currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutosaveStatus {
    #[default]
    Idle,
    Saving,
    Error,
}

impl fmt::Display for AutosaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AutosaveStatus::Idle => "idle",
            AutosaveStatus::Saving => "saving",
            AutosaveStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Identifier of a scheduled debounce task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Sync bookkeeping surfaced to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncMeta {
    pub last_saved: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub pending_timer: Option<TimerId>,
}

/// Server copy of an in-progress quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveRecord {
    pub quiz_data: QuizSnapshot,
    pub updated_at: DateTime<Utc>,
}
