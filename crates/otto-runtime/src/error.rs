//! Error types for container runtime adapters.

use std::fmt;

use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Runtime operation, used to label failures and recorded calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeOp {
    Connect,
    Create,
    Start,
    Stop,
    Remove,
    Export,
    Import,
    Inspect,
    List,
}

impl fmt::Display for RuntimeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuntimeOp::Connect => "connect",
            RuntimeOp::Create => "create",
            RuntimeOp::Start => "start",
            RuntimeOp::Stop => "stop",
            RuntimeOp::Remove => "remove",
            RuntimeOp::Export => "export",
            RuntimeOp::Import => "import",
            RuntimeOp::Inspect => "inspect",
            RuntimeOp::List => "list",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by a container runtime adapter.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("not connected to container runtime at {0}")]
    NotConnected(String),

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("container name already in use: {0}")]
    NameConflict(String),

    #[error("invalid archive: {0}")]
    Archive(String),

    #[error("failed to {op} {target}: {reason}")]
    Operation {
        op: RuntimeOp,
        target: String,
        reason: String,
    },
}

impl RuntimeError {
    pub fn operation(op: RuntimeOp, target: &str, reason: impl Into<String>) -> Self {
        RuntimeError::Operation {
            op,
            target: target.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_error_message() {
        let err = RuntimeError::operation(RuntimeOp::Export, "c1", "disk full");
        assert_eq!(err.to_string(), "failed to export c1: disk full");
    }

    #[test]
    fn not_connected_names_endpoint() {
        let err = RuntimeError::NotConnected("ssh://pi@node2".to_string());
        assert!(err.to_string().contains("ssh://pi@node2"));
    }
}
