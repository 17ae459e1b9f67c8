use std::sync::Arc;

use backend::{BackendConfig, HttpQuizBackend, InMemoryBackend, QuizBackendClient};
use quiz_core::model::UserId;

use crate::config::AutosaveConfig;
use crate::error::StoreError;
use crate::quiz::QuizProgressStore;
use crate::Clock;

/// Wires a backend client and autosave settings into quiz stores.
#[derive(Clone)]
pub struct AppServices {
    backend: Arc<dyn QuizBackendClient>,
    autosave: AutosaveConfig,
    clock: Clock,
}

impl AppServices {
    /// Build services talking to the HTTP quiz API.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the HTTP client cannot be built.
    pub fn new_http(
        backend_config: BackendConfig,
        autosave: AutosaveConfig,
        clock: Clock,
    ) -> Result<Self, StoreError> {
        let backend = HttpQuizBackend::new(backend_config)?;
        Ok(Self::with_backend(Arc::new(backend), autosave, clock))
    }

    /// Build HTTP services from `QUIZ_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` for missing or invalid settings.
    pub fn from_env(clock: Clock) -> Result<Self, StoreError> {
        let backend_config = BackendConfig::from_env()?;
        let autosave = AutosaveConfig::from_env()?;
        Self::new_http(backend_config, autosave, clock)
    }

    #[must_use]
    pub fn in_memory(backend: InMemoryBackend, autosave: AutosaveConfig, clock: Clock) -> Self {
        Self::with_backend(Arc::new(backend), autosave, clock)
    }

    #[must_use]
    pub fn with_backend(
        backend: Arc<dyn QuizBackendClient>,
        autosave: AutosaveConfig,
        clock: Clock,
    ) -> Self {
        Self {
            backend,
            autosave,
            clock,
        }
    }

    #[must_use]
    pub fn backend(&self) -> Arc<dyn QuizBackendClient> {
        Arc::clone(&self.backend)
    }

    #[must_use]
    pub fn autosave_config(&self) -> AutosaveConfig {
        self.autosave
    }

    /// A fresh store for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoRuntime` outside a Tokio runtime.
    pub fn progress_store(&self, user_id: UserId) -> Result<QuizProgressStore, StoreError> {
        Ok(QuizProgressStore::new(self.backend(), self.autosave, self.clock)?.with_user(user_id))
    }
}
