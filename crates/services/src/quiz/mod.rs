mod autosave;
mod state;
mod store;

// Public API of the quiz progress subsystem.
pub use crate::error::StoreError;
pub use store::QuizProgressStore;
