use std::env;
use std::time::Duration;

use backend::ConfigError;
use backend::config::parse_number;

pub const ENV_AUTOSAVE_DELAY_MS: &str = "QUIZ_AUTOSAVE_DELAY_MS";

/// Quiet period before queued edits are autosaved.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 3_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutosaveConfig {
    delay: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS),
        }
    }
}

impl AutosaveConfig {
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Read `QUIZ_AUTOSAVE_DELAY_MS`, falling back to the default delay.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` if the variable is set but not an integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` if the variable is set but not an integer.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        match lookup(ENV_AUTOSAVE_DELAY_MS) {
            Some(raw) => {
                let millis = parse_number(ENV_AUTOSAVE_DELAY_MS, &raw)?;
                Ok(Self::with_delay(Duration::from_millis(millis)))
            }
            None => Ok(Self::default()),
        }
    }
}
