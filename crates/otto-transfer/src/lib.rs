//! otto-transfer: move binary payloads over message-oriented transports.
//!
//! Message buses have no notion of a stream or of end-of-stream, so a
//! payload (typically a container filesystem archive) is split into
//! fixed-size chunks, each published as its own message with a SHA-256
//! checksum, bracketed by a metadata message and a completion signal.
//! The receiver only hands a payload over when every chunk verified and
//! the reassembled bytes match the whole-payload digest.
//!
//! # Protocol
//!
//! ```text
//! sender                                   receiver
//!   │ {prefix}/metadata  (id, size, n, sha256) ──▶ TransferState: Pending
//!   │ {prefix}/chunk     (id, 0, n, b64, sha256) ─▶ verify, store: InProgress
//!   │ ...                                          ...
//!   │ {prefix}/chunk     (id, n-1, ...)  ────────▶
//!   │ {prefix}/complete  (id, success) ──────────▶ all n present?
//!   │                                              sha256(assembled) == declared?
//!   │                                              ├─ yes: on_complete(id, bytes)
//!   │                                              └─ no:  on_error(id, reason)
//! ```
//!
//! There is no retry or resumption: a failed transfer is reported once
//! and its state is dropped.

pub mod error;
pub mod message;
pub mod receiver;
pub mod sender;
pub mod transport;

pub use error::{TransferError, TransferResult};
pub use message::{
    InitiateTransferRequest, InitiateTransferResponse, TransferChunk, TransferComplete,
    TransferMessage, TransferMetadata, sha256_hex,
};
pub use receiver::{
    ChunkedTransferReceiver, CompleteCallback, ErrorCallback, TransferState, TransferStatus,
};
pub use sender::ChunkedTransferSender;
pub use transport::{
    ChannelTransport, Envelope, JsonLinesTransport, MessageTransport, deliver, read_envelopes,
};
