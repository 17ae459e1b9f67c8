use async_trait::async_trait;
use quiz_core::Clock;
use quiz_core::model::{
    AttemptId, AttemptRecord, AutosaveRecord, NewAttempt, QuizSnapshot, UserId,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

use crate::client::{BackendError, BackendOp, QuizBackendClient};

/// One call observed by `InMemoryBackend`, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    UpsertAutosave {
        user_id: UserId,
        snapshot: QuizSnapshot,
    },
    FetchAutosave {
        user_id: UserId,
    },
    DeleteAutosave {
        user_id: UserId,
    },
    SaveAttempt {
        attempt: NewAttempt,
    },
    ListAttempts {
        user_id: UserId,
        limit: u32,
    },
    FetchAttempt {
        attempt_id: AttemptId,
    },
}

impl BackendCall {
    #[must_use]
    pub fn op(&self) -> BackendOp {
        match self {
            BackendCall::UpsertAutosave { .. } => BackendOp::UpsertAutosave,
            BackendCall::FetchAutosave { .. } => BackendOp::FetchAutosave,
            BackendCall::DeleteAutosave { .. } => BackendOp::DeleteAutosave,
            BackendCall::SaveAttempt { .. } => BackendOp::SaveAttempt,
            BackendCall::ListAttempts { .. } => BackendOp::ListAttempts,
            BackendCall::FetchAttempt { .. } => BackendOp::FetchAttempt,
        }
    }
}

#[derive(Default)]
struct MemoryState {
    autosaves: HashMap<UserId, AutosaveRecord>,
    attempts: Vec<AttemptRecord>,
    calls: Vec<BackendCall>,
    failures: HashMap<BackendOp, VecDeque<BackendError>>,
    delays: HashMap<BackendOp, VecDeque<Duration>>,
}

/// Quiz API kept in process memory.
///
/// Every call is recorded. Failures and response latency can be queued per
/// operation; each queued entry is consumed by exactly one call.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    clock: Clock,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: BackendOp, error: BackendError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Make the next call of `op` take `delay` before it answers.
    pub fn delay_next(&self, op: BackendOp, delay: Duration) {
        self.lock().delays.entry(op).or_default().push_back(delay);
    }

    pub fn seed_autosave(&self, user_id: UserId, record: AutosaveRecord) {
        self.lock().autosaves.insert(user_id, record);
    }

    #[must_use]
    pub fn autosave_for(&self, user_id: UserId) -> Option<AutosaveRecord> {
        self.lock().autosaves.get(&user_id).cloned()
    }

    #[must_use]
    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.lock().attempts.clone()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    #[must_use]
    pub fn call_count(&self, op: BackendOp) -> usize {
        self.lock().calls.iter().filter(|call| call.op() == op).count()
    }

    /// Snapshots sent to the autosave upsert, oldest first.
    #[must_use]
    pub fn upserted_snapshots(&self) -> Vec<QuizSnapshot> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::UpsertAutosave { snapshot, .. } => Some(snapshot.clone()),
                _ => None,
            })
            .collect()
    }

    // Test helpers read through poisoning; a panicking test already failed.
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock(&self) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        self.state
            .lock()
            .map_err(|e| BackendError::Transport(e.to_string()))
    }

    /// Record the call, then honour any queued latency and failure for it.
    async fn begin(&self, call: BackendCall) -> Result<(), BackendError> {
        let op = call.op();
        let (delay, failure) = {
            let mut guard = self.try_lock()?;
            guard.calls.push(call);
            let delay = guard.delays.get_mut(&op).and_then(VecDeque::pop_front);
            let failure = guard.failures.get_mut(&op).and_then(VecDeque::pop_front);
            (delay, failure)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QuizBackendClient for InMemoryBackend {
    async fn upsert_autosave(
        &self,
        user_id: UserId,
        snapshot: &QuizSnapshot,
    ) -> Result<(), BackendError> {
        self.begin(BackendCall::UpsertAutosave {
            user_id,
            snapshot: snapshot.clone(),
        })
        .await?;

        let record = AutosaveRecord {
            quiz_data: snapshot.clone(),
            updated_at: self.clock.now(),
        };
        self.try_lock()?.autosaves.insert(user_id, record);
        Ok(())
    }

    async fn fetch_autosave(&self, user_id: UserId) -> Result<Option<AutosaveRecord>, BackendError> {
        self.begin(BackendCall::FetchAutosave { user_id }).await?;
        Ok(self.try_lock()?.autosaves.get(&user_id).cloned())
    }

    async fn delete_autosave(&self, user_id: UserId) -> Result<(), BackendError> {
        self.begin(BackendCall::DeleteAutosave { user_id }).await?;
        self.try_lock()?.autosaves.remove(&user_id);
        Ok(())
    }

    async fn save_attempt(&self, attempt: &NewAttempt) -> Result<AttemptRecord, BackendError> {
        self.begin(BackendCall::SaveAttempt {
            attempt: attempt.clone(),
        })
        .await?;

        let record = AttemptRecord::from_new(
            AttemptId::new(Uuid::new_v4()),
            attempt.clone(),
            self.clock.now(),
        );
        self.try_lock()?.attempts.push(record.clone());
        Ok(record)
    }

    async fn list_attempts(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, BackendError> {
        self.begin(BackendCall::ListAttempts { user_id, limit })
            .await?;

        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let guard = self.try_lock()?;
        Ok(guard
            .attempts
            .iter()
            .rev()
            .filter(|attempt| attempt.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_attempt(&self, attempt_id: AttemptId) -> Result<AttemptRecord, BackendError> {
        self.begin(BackendCall::FetchAttempt { attempt_id }).await?;
        self.try_lock()?
            .attempts
            .iter()
            .find(|attempt| attempt.id == attempt_id)
            .cloned()
            .ok_or_else(|| BackendError::api("attempt not found", Some("not_found")))
    }
}
