//! Debounced autosave: one pending timer per store, snapshot taken when the
//! timer fires, responses applied only if they belong to the newest request.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use backend::QuizBackendClient;
use quiz_core::Clock;
use quiz_core::model::{AutosaveStatus, QuizSnapshot, TimerId, UserId};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::state::{PendingAutosave, StoreState};
use crate::config::AutosaveConfig;

/// State and collaborators shared between the store and its timer tasks.
pub(super) struct Shared {
    pub backend: Arc<dyn QuizBackendClient>,
    pub config: AutosaveConfig,
    pub clock: Clock,
    pub runtime: Handle,
    pub state: Mutex<StoreState>,
}

/// An autosave request that has left the debounce window.
pub(super) struct Dispatch {
    seq: u64,
    user_id: UserId,
    snapshot: QuizSnapshot,
}

impl Shared {
    // StoreState is plain data; a panic while holding the lock cannot leave it
    // half-updated in a way later calls would misread.
    pub fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace any pending timer with a fresh one.
    pub fn schedule(self: &Arc<Self>, state: &mut StoreState) {
        if state.session.is_complete() {
            debug!("quiz complete, autosave not scheduled");
            return;
        }

        if let Some(previous) = state.pending.take() {
            debug!(timer = previous.id.value(), "superseding pending autosave");
            previous.cancel();
        }

        state.next_timer_id = state.next_timer_id.wrapping_add(1);
        let id = TimerId::new(state.next_timer_id);
        let delay = self.config.delay();
        let shared = Arc::clone(self);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.fire(id).await;
        });

        debug!(timer = id.value(), delay_ms = delay.as_millis(), "autosave scheduled");
        state.pending = Some(PendingAutosave { id, handle });
    }

    async fn fire(&self, id: TimerId) {
        let dispatch = {
            let mut state = self.lock();
            if state.pending.as_ref().map(|pending| pending.id) != Some(id) {
                return;
            }
            // Detach before going to the network so a newer edit can only
            // cancel its own timer, never this request.
            state.pending = None;
            self.begin(&mut state)
        };

        if let Some(dispatch) = dispatch {
            self.run(dispatch).await;
        }
    }

    /// Move to `Saving` and capture what to send.
    pub fn begin(&self, state: &mut StoreState) -> Option<Dispatch> {
        if state.session.is_complete() {
            return None;
        }
        let Some(user_id) = state.user_id else {
            debug!("no active user, autosave skipped");
            return None;
        };

        state.autosave_seq = state.autosave_seq.wrapping_add(1);
        state.status = AutosaveStatus::Saving;
        Some(Dispatch {
            seq: state.autosave_seq,
            user_id,
            snapshot: state.session.snapshot(),
        })
    }

    /// Send the snapshot and fold the response into state. Returns whether the
    /// backend accepted it.
    pub async fn run(&self, dispatch: Dispatch) -> bool {
        let outcome = self
            .backend
            .upsert_autosave(dispatch.user_id, &dispatch.snapshot)
            .await;

        let mut state = self.lock();
        if state.autosave_seq != dispatch.seq {
            warn!(
                seq = dispatch.seq,
                latest = state.autosave_seq,
                ok = outcome.is_ok(),
                "dropping stale autosave response"
            );
            return outcome.is_ok();
        }

        match outcome {
            Ok(()) => {
                state.status = AutosaveStatus::Idle;
                state.last_saved = Some(self.clock.now());
                state.error = None;
                info!(
                    user = %dispatch.user_id,
                    step = dispatch.snapshot.current_step,
                    answers = dispatch.snapshot.answers.len(),
                    "quiz autosaved"
                );
                true
            }
            Err(err) => {
                warn!(user = %dispatch.user_id, error = %err, "quiz autosave failed");
                state.status = AutosaveStatus::Error;
                state.error = Some(err.message());
                false
            }
        }
    }
}
