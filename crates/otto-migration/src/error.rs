//! Migration error types.

use otto_core::UnknownStrategy;
use otto_runtime::RuntimeError;
use thiserror::Error;

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

/// Errors raised by migration strategies and the coordinator.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Could not stop or serialize the source container.
    #[error("export of {container} failed: {reason}")]
    Export {
        container: String,
        /// The source was already stopped when the failure happened.
        source_stopped: bool,
        reason: String,
    },

    /// Could not register the payload or create the container on the target.
    #[error("import of {container} failed: {reason}")]
    Import { container: String, reason: String },

    /// Chunk or whole-payload integrity failure while moving the payload.
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("unsupported migration strategy: {0}")]
    UnsupportedStrategy(String),

    #[error("{0} not implemented")]
    NotImplemented(&'static str),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl MigrationError {
    pub(crate) fn export(container: &str, source_stopped: bool, err: impl ToString) -> Self {
        MigrationError::Export {
            container: container.to_string(),
            source_stopped,
            reason: err.to_string(),
        }
    }

    pub(crate) fn import(container: &str, err: impl ToString) -> Self {
        MigrationError::Import {
            container: container.to_string(),
            reason: err.to_string(),
        }
    }

    /// Whether the source container was down when this error surfaced,
    /// i.e. the workload currently runs nowhere.
    pub fn source_stopped(&self) -> bool {
        match self {
            MigrationError::Export { source_stopped, .. } => *source_stopped,
            MigrationError::Import { .. } | MigrationError::Transfer(_) => true,
            _ => false,
        }
    }
}

impl From<UnknownStrategy> for MigrationError {
    fn from(e: UnknownStrategy) -> Self {
        MigrationError::UnsupportedStrategy(e.0)
    }
}
