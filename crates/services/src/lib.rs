#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod quiz;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use config::AutosaveConfig;
pub use error::StoreError;
pub use quiz::QuizProgressStore;
