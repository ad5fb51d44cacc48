//! Error types for the Stellar fleet state.

use thiserror::Error;

/// Result type alias for fleet state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors surfaced by registry and policy operations.
///
/// Missing history or an empty fleet are not errors; those queries degrade
/// to empty or zero results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid report: {0}")]
    InvalidReport(String),

    #[error("fleet monitor is shutting down")]
    ShuttingDown,
}
