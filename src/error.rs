//! Error kinds shared by the kill-list store, the process table and the router.

use thiserror::Error;

/// Errors surfaced by process control operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Process with PID {0} not found")]
    NotFound(u32),
    #[error("Permission denied to kill process {0}")]
    PermissionDenied(u32),
    #[error("Failed to persist kill list: {0}")]
    PersistenceError(String),
    #[error("Failed to kill process {0}: {1}")]
    TerminationFailed(u32, String),
}

impl ControlError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlError::InvalidInput(_) => "invalid_input",
            ControlError::NotFound(_) => "not_found",
            ControlError::PermissionDenied(_) => "permission_denied",
            ControlError::PersistenceError(_) => "persistence_error",
            ControlError::TerminationFailed(..) => "termination_failed",
        }
    }
}
