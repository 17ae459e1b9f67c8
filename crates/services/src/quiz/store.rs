use std::sync::{Arc, Mutex};

use backend::QuizBackendClient;
use chrono::{DateTime, Utc};
use quiz_core::Clock;
use quiz_core::model::{
    Answer, AttemptId, AttemptRecord, AutosaveStatus, NewAttempt, QuestionId, QuizAnswers,
    QuizResults, QuizSession, SyncMeta, UserId,
};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::autosave::Shared;
use super::state::StoreState;
use crate::config::AutosaveConfig;
use crate::error::StoreError;

/// Client-side quiz progress with debounced autosave.
///
/// Edits through `set_current_step` and `set_answer` (re)start a single
/// autosave timer; when it fires, whatever the session holds at that moment is
/// sent to the backend. Operations that talk to the backend never return the
/// backend error as a failure of the store itself: they record the message in
/// `error()` and report success as a `bool` (or a `Result` for fetches).
///
/// Dropping the store cancels the pending timer. Requests already sent finish
/// on their own.
pub struct QuizProgressStore {
    shared: Arc<Shared>,
}

impl QuizProgressStore {
    /// Create a store bound to the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoRuntime` when called outside a runtime.
    pub fn new(
        backend: Arc<dyn QuizBackendClient>,
        config: AutosaveConfig,
        clock: Clock,
    ) -> Result<Self, StoreError> {
        let runtime = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        Ok(Self {
            shared: Arc::new(Shared {
                backend,
                config,
                clock,
                runtime,
                state: Mutex::new(StoreState::default()),
            }),
        })
    }

    /// Bind the user autosaves are written for.
    #[must_use]
    pub fn with_user(self, user_id: UserId) -> Self {
        self.shared.lock().user_id = Some(user_id);
        self
    }

    // ─── Edits ─────────────────────────────────────────────────────────────────

    /// Move to `step` and schedule an autosave. Steps are not range checked.
    pub fn set_current_step(&self, step: u32) {
        let mut state = self.shared.lock();
        state.session.set_current_step(step);
        self.shared.schedule(&mut state);
    }

    /// Record one answer (overwriting any previous one) and schedule an autosave.
    pub fn set_answer(&self, question: QuestionId, answer: impl Into<Answer>) {
        let mut state = self.shared.lock();
        state.session.set_answer(question, answer.into());
        self.shared.schedule(&mut state);
    }

    /// Replace all answers without scheduling an autosave.
    pub fn set_answers(&self, answers: QuizAnswers) {
        self.shared.lock().session.replace_answers(answers);
    }

    /// Finish the quiz. No autosave runs after this until `reset_quiz`.
    pub fn set_complete(&self, results: QuizResults) {
        let mut state = self.shared.lock();
        state.session.complete(results);
        state.status = AutosaveStatus::Idle;
        if state.cancel_pending() {
            debug!("pending autosave cancelled by completion");
        }
        state.invalidate_in_flight();
    }

    pub fn set_error(&self, error: Option<String>) {
        self.shared.lock().error = error;
    }

    /// Restart the autosave debounce window for the current session.
    pub fn autosave_quiz(&self) {
        let mut state = self.shared.lock();
        self.shared.schedule(&mut state);
    }

    /// Skip the rest of the debounce window and save now.
    ///
    /// Returns `true` when there was nothing to save or the backend accepted
    /// the snapshot. Unsaved edits with no bound user record `NoActiveUser`.
    pub async fn flush_autosave(&self) -> bool {
        let dispatch = {
            let mut state = self.shared.lock();
            if state.session.is_complete() {
                return true;
            }
            let had_pending = state.cancel_pending();
            if !had_pending && state.status != AutosaveStatus::Error {
                return true;
            }
            match self.shared.begin(&mut state) {
                Some(dispatch) => dispatch,
                None => {
                    state.error = Some(StoreError::NoActiveUser.to_string());
                    return false;
                }
            }
        };

        self.shared.run(dispatch).await
    }

    /// Restore defaults and cancel the pending autosave.
    pub fn reset_quiz(&self) {
        self.shared.lock().reset();
        debug!("quiz progress reset");
    }

    /// Cancel the pending autosave without touching the session.
    pub fn shutdown(&self) {
        if self.shared.lock().cancel_pending() {
            debug!("pending autosave cancelled on shutdown");
        }
    }

    // ─── Backend round trips ───────────────────────────────────────────────────

    /// Restore step and answers from the user's autosave.
    ///
    /// Returns `false` when nothing was restored: the fetch failed (message in
    /// `error()`) or the user has no autosave. Local state is untouched then.
    pub async fn load_autosaved_quiz(&self, user_id: UserId) -> bool {
        self.shared.lock().user_id = Some(user_id);

        match self.shared.backend.fetch_autosave(user_id).await {
            Ok(Some(record)) => {
                let mut state = self.shared.lock();
                info!(
                    user = %user_id,
                    step = record.quiz_data.current_step,
                    answers = record.quiz_data.answers.len(),
                    "autosaved quiz restored"
                );
                state.session.restore(record.quiz_data);
                state.last_saved = Some(record.updated_at);
                state.error = None;
                true
            }
            Ok(None) => {
                debug!(user = %user_id, "no autosaved quiz");
                false
            }
            Err(err) => {
                warn!(user = %user_id, error = %err, "loading autosaved quiz failed");
                self.shared.lock().error = Some(err.message());
                false
            }
        }
    }

    /// Submit the completed quiz as an attempt.
    ///
    /// On success the pending autosave is cancelled and the user's autosave is
    /// deleted. That delete is best effort: its failure lands in
    /// `cleanup_error()` and does not change the returned `true`.
    pub async fn save_quiz_attempt(&self, user_id: UserId, has_image_analysis: bool) -> bool {
        let attempt = {
            let mut state = self.shared.lock();
            state.user_id = Some(user_id);
            let Some(results) = state.session.results().cloned() else {
                state.error = Some(StoreError::NotComplete.to_string());
                return false;
            };
            NewAttempt {
                user_id,
                quiz_data: state.session.snapshot(),
                results,
                has_image_analysis,
            }
        };

        let record = match self.shared.backend.save_attempt(&attempt).await {
            Ok(record) => record,
            Err(err) => {
                warn!(user = %user_id, error = %err, "saving quiz attempt failed");
                self.shared.lock().error = Some(err.message());
                return false;
            }
        };

        info!(user = %user_id, attempt = %record.id, "quiz attempt saved");
        {
            let mut state = self.shared.lock();
            state.cancel_pending();
            state.invalidate_in_flight();
            state.error = None;
            state.last_attempt = Some(record);
        }

        let cleanup = self.shared.backend.delete_autosave(user_id).await;
        let mut state = self.shared.lock();
        match cleanup {
            Ok(()) => state.cleanup_error = None,
            Err(err) => {
                warn!(user = %user_id, error = %err, "autosave cleanup after attempt failed");
                state.cleanup_error = Some(err.message());
            }
        }
        true
    }

    /// Most recent attempts for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` on failure; the message is also kept in `error()`.
    pub async fn fetch_attempt_history(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StoreError> {
        let outcome = self.shared.backend.list_attempts(user_id, limit).await;
        self.record_outcome(outcome)
    }

    /// # Errors
    ///
    /// Returns `StoreError::Backend` on failure; the message is also kept in `error()`.
    pub async fn fetch_attempt(&self, attempt_id: AttemptId) -> Result<AttemptRecord, StoreError> {
        let outcome = self.shared.backend.fetch_attempt(attempt_id).await;
        self.record_outcome(outcome)
    }

    fn record_outcome<T>(
        &self,
        outcome: Result<T, backend::BackendError>,
    ) -> Result<T, StoreError> {
        outcome.map_err(|err| {
            warn!(error = %err, "quiz history request failed");
            self.shared.lock().error = Some(err.message());
            StoreError::Backend(err)
        })
    }

    // ─── Reads ─────────────────────────────────────────────────────────────────

    /// Copy of the current session.
    #[must_use]
    pub fn session(&self) -> QuizSession {
        self.shared.lock().session.clone()
    }

    #[must_use]
    pub fn current_step(&self) -> u32 {
        self.shared.lock().session.current_step()
    }

    #[must_use]
    pub fn answers(&self) -> QuizAnswers {
        self.shared.lock().session.answers().clone()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.shared.lock().session.is_complete()
    }

    #[must_use]
    pub fn results(&self) -> Option<QuizResults> {
        self.shared.lock().session.results().cloned()
    }

    #[must_use]
    pub fn autosave_status(&self) -> AutosaveStatus {
        self.shared.lock().status
    }

    #[must_use]
    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.shared.lock().last_saved
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.shared.lock().error.clone()
    }

    /// Failure of the autosave delete that follows a saved attempt.
    #[must_use]
    pub fn cleanup_error(&self) -> Option<String> {
        self.shared.lock().cleanup_error.clone()
    }

    #[must_use]
    pub fn last_attempt(&self) -> Option<AttemptRecord> {
        self.shared.lock().last_attempt.clone()
    }

    #[must_use]
    pub fn sync_meta(&self) -> SyncMeta {
        self.shared.lock().sync_meta()
    }

    #[must_use]
    pub fn has_pending_autosave(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.shared.lock().user_id
    }
}

impl Drop for QuizProgressStore {
    fn drop(&mut self) {
        self.shared.lock().cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::{BackendError, BackendOp, InMemoryBackend};
    use quiz_core::time::fixed_clock;
    use serde_json::json;
    use std::time::Duration;

    fn qid(raw: &str) -> QuestionId {
        QuestionId::new(raw).unwrap()
    }

    fn store_with(backend: &InMemoryBackend) -> QuizProgressStore {
        QuizProgressStore::new(
            Arc::new(backend.clone()),
            AutosaveConfig::default(),
            fixed_clock(),
        )
        .unwrap()
        .with_user(UserId::random())
    }

    #[test]
    fn new_outside_runtime_is_rejected() {
        let result = QuizProgressStore::new(
            Arc::new(InMemoryBackend::new()),
            AutosaveConfig::default(),
            Clock::System,
        );
        assert!(matches!(result, Err(StoreError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_store_has_defaults() {
        let store = store_with(&InMemoryBackend::new());
        assert_eq!(store.session(), QuizSession::default());
        assert_eq!(store.autosave_status(), AutosaveStatus::Idle);
        assert_eq!(store.sync_meta(), SyncMeta::default());
        assert!(store.cleanup_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_defaults_and_cancels_timer() {
        let backend = InMemoryBackend::new();
        let store = store_with(&backend);

        store.set_current_step(3);
        store.set_answer(qid("skin_type"), "oily");
        store.set_error(Some("stale".into()));
        assert!(store.has_pending_autosave());

        store.reset_quiz();

        assert_eq!(store.session(), QuizSession::default());
        assert_eq!(store.autosave_status(), AutosaveStatus::Idle);
        assert_eq!(store.sync_meta(), SyncMeta::default());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.call_count(BackendOp::UpsertAutosave), 0);
        assert_eq!(store.session(), QuizSession::default());
    }

    #[tokio::test(start_paused = true)]
    async fn set_answers_replaces_without_scheduling() {
        let store = store_with(&InMemoryBackend::new());
        store.set_answer(qid("q1"), "oily");
        store.shutdown();
        assert!(!store.has_pending_autosave());

        let replacement: QuizAnswers = [(qid("q2"), Answer::Scale(4))].into_iter().collect();
        store.set_answers(replacement.clone());

        assert_eq!(store.answers(), replacement);
        assert!(!store.has_pending_autosave());
    }

    #[tokio::test(start_paused = true)]
    async fn sync_meta_exposes_pending_timer_id() {
        let store = store_with(&InMemoryBackend::new());
        store.set_current_step(1);
        let first = store.sync_meta().pending_timer.unwrap();
        store.set_current_step(2);
        let second = store.sync_meta().pending_timer.unwrap();
        assert!(second.value() > first.value());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_saves_immediately_and_retries_after_error() {
        let backend = InMemoryBackend::new();
        let store = store_with(&backend);

        assert!(store.flush_autosave().await);
        assert_eq!(backend.call_count(BackendOp::UpsertAutosave), 0);

        backend.fail_next(BackendOp::UpsertAutosave, BackendError::Transport("offline".into()));
        store.set_answer(qid("q1"), "dry");
        assert!(!store.flush_autosave().await);
        assert_eq!(store.autosave_status(), AutosaveStatus::Error);
        assert!(!store.has_pending_autosave());

        assert!(store.flush_autosave().await);
        assert_eq!(store.autosave_status(), AutosaveStatus::Idle);
        assert_eq!(backend.call_count(BackendOp::UpsertAutosave), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_without_user_is_skipped() {
        let backend = InMemoryBackend::new();
        let store = QuizProgressStore::new(
            Arc::new(backend.clone()),
            AutosaveConfig::default(),
            fixed_clock(),
        )
        .unwrap();

        store.set_answer(qid("q1"), "oily");
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(backend.call_count(BackendOp::UpsertAutosave), 0);
        assert_eq!(store.autosave_status(), AutosaveStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_without_user_reports_why() {
        let backend = InMemoryBackend::new();
        let store = QuizProgressStore::new(
            Arc::new(backend.clone()),
            AutosaveConfig::default(),
            fixed_clock(),
        )
        .unwrap();

        assert!(store.flush_autosave().await);
        assert!(store.error().is_none());

        store.set_answer(qid("q1"), "oily");
        assert!(!store.flush_autosave().await);
        assert_eq!(store.error().as_deref(), Some("no active user to autosave for"));
        assert!(!store.has_pending_autosave());
        assert_eq!(backend.call_count(BackendOp::UpsertAutosave), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn save_attempt_requires_completion() {
        let backend = InMemoryBackend::new();
        let store = store_with(&backend);
        let user = store.user_id().unwrap();

        assert!(!store.save_quiz_attempt(user, false).await);
        assert_eq!(store.error().as_deref(), Some("quiz is not complete"));
        assert_eq!(backend.call_count(BackendOp::SaveAttempt), 0);

        store.set_complete(QuizResults::new(json!({ "skin_type": "dry" })));
        assert!(store.save_quiz_attempt(user, true).await);
        assert!(store.error().is_none());
        assert!(store.last_attempt().unwrap().has_image_analysis);
    }
}
