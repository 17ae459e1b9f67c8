#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod envelope;
pub mod http;
pub mod memory;

pub use client::{BackendError, BackendOp, QuizBackendClient};
pub use config::{BackendConfig, ConfigError};
pub use http::HttpQuizBackend;
pub use memory::{BackendCall, InMemoryBackend};
