//! Transfer error types.

use thiserror::Error;

/// Result type alias for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors raised while sending or verifying a chunked transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("failed to decode chunk {index}: {reason}")]
    Decode { index: u64, reason: String },

    #[error("chunk {index} out of range (total {total})")]
    ChunkOutOfRange { index: u64, total: u64 },

    #[error("chunk {index} declares {declared} chunks, transfer has {expected}")]
    ChunkCountMismatch {
        index: u64,
        declared: u64,
        expected: u64,
    },

    #[error("chunk {index} checksum mismatch")]
    ChunkChecksum { index: u64 },

    #[error("missing chunks: {received}/{total}")]
    MissingChunks { received: u64, total: u64 },

    #[error("size mismatch: expected {expected} bytes, assembled {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("checksum verification failed")]
    ChecksumVerification,

    #[error("transfer aborted by sender: {0}")]
    Aborted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
