use chrono::{DateTime, Utc};
use quiz_core::model::{AttemptRecord, AutosaveStatus, QuizSession, SyncMeta, TimerId, UserId};
use tokio::task::JoinHandle;

/// The debounce task currently waiting out its delay.
pub(super) struct PendingAutosave {
    pub id: TimerId,
    pub handle: JoinHandle<()>,
}

impl PendingAutosave {
    pub fn cancel(self) {
        self.handle.abort();
    }
}

/// Everything the store owns, guarded by one mutex.
///
/// `autosave_seq` counts dispatched autosaves; a response is only applied
/// while its sequence number is still the latest. Reset and completion bump
/// it so responses already in flight are ignored.
#[derive(Default)]
pub(super) struct StoreState {
    pub session: QuizSession,
    pub status: AutosaveStatus,
    pub last_saved: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub cleanup_error: Option<String>,
    pub last_attempt: Option<AttemptRecord>,
    pub user_id: Option<UserId>,
    pub pending: Option<PendingAutosave>,
    pub next_timer_id: u64,
    pub autosave_seq: u64,
}

impl StoreState {
    /// Abort the waiting debounce task, if any. Returns whether one was pending.
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.cancel();
                true
            }
            None => false,
        }
    }

    /// Make every in-flight autosave response stale.
    pub fn invalidate_in_flight(&mut self) {
        self.autosave_seq = self.autosave_seq.wrapping_add(1);
    }

    pub fn sync_meta(&self) -> SyncMeta {
        SyncMeta {
            last_saved: self.last_saved,
            error: self.error.clone(),
            pending_timer: self.pending.as_ref().map(|pending| pending.id),
        }
    }

    /// Back to a fresh quiz. The bound user survives; sequence and timer
    /// counters keep counting so old ids never match again.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.invalidate_in_flight();
        self.session.reset();
        self.status = AutosaveStatus::Idle;
        self.last_saved = None;
        self.error = None;
        self.cleanup_error = None;
        self.last_attempt = None;
    }
}
