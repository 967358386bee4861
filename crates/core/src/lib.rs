//! Shared foundations for lotbridge: the layered configuration model and the
//! error taxonomy used by the agent and chat crates.

pub mod config;
pub mod errors;

pub use config::{AppConfig, ConfigError, LoadOptions};
pub use errors::{BackendError, LlmServiceError, ToolError};
