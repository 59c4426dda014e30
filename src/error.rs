//! # Errors
//!
//! Top-level controller error. Everything here ends the process; recoverable
//! conditions (bad input, failed downstream calls) are handled where they
//! occur and never reach this type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::controller::reconciler::RetriesExhausted;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    RetriesExhausted(#[from] RetriesExhausted),
    #[error("all credential sources have stopped")]
    SourceClosed,
    #[error("service '{service}' has no port named '{port}'")]
    MissingServicePort { service: String, port: String },
}
