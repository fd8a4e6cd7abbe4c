//! Receiving side of the chunked transfer protocol.
//!
//! The receiver owns one [`TransferState`] per in-flight transfer ID.
//! Messages for different transfers may arrive concurrently; messages of
//! a single transfer are expected in publish order. Failures never
//! propagate to the caller: they are reported once through the error
//! callback and the transfer's state is discarded.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::error::TransferError;
use crate::message::{
    InitiateTransferRequest, InitiateTransferResponse, TransferChunk, TransferComplete,
    TransferMessage, TransferMetadata, sha256_hex,
};

/// Called with `(transfer_id, payload)` when a transfer verifies.
pub type CompleteCallback = Box<dyn Fn(&str, Vec<u8>) + Send + Sync>;

/// Called with `(transfer_id, reason)` when a transfer fails.
pub type ErrorCallback = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Lifecycle of a tracked transfer. Completion and failure are terminal:
/// they are reported through the callbacks and the state is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Pending,
    InProgress,
}

/// Receiver-side bookkeeping for one transfer.
#[derive(Debug, Clone)]
pub struct TransferState {
    pub transfer_id: String,
    pub total_size: u64,
    pub total_chunks: u64,
    pub expected_checksum: String,
    pub received_chunks: BTreeMap<u64, Vec<u8>>,
    pub status: TransferStatus,
}

impl TransferState {
    fn new(transfer_id: &str, total_size: u64, total_chunks: u64, checksum: &str) -> Self {
        Self {
            transfer_id: transfer_id.to_string(),
            total_size,
            total_chunks,
            expected_checksum: checksum.to_string(),
            received_chunks: BTreeMap::new(),
            status: TransferStatus::Pending,
        }
    }

    pub fn chunks_received(&self) -> u64 {
        self.received_chunks.len() as u64
    }

    pub fn is_complete(&self) -> bool {
        self.chunks_received() == self.total_chunks
    }

    /// Verify one chunk and store it. Duplicate indices overwrite.
    fn add_chunk(&mut self, chunk: &TransferChunk) -> Result<(), TransferError> {
        if chunk.total_chunks != self.total_chunks {
            return Err(TransferError::ChunkCountMismatch {
                index: chunk.chunk_index,
                declared: chunk.total_chunks,
                expected: self.total_chunks,
            });
        }
        if chunk.chunk_index >= self.total_chunks {
            return Err(TransferError::ChunkOutOfRange {
                index: chunk.chunk_index,
                total: self.total_chunks,
            });
        }
        let data = chunk.decode().map_err(|e| TransferError::Decode {
            index: chunk.chunk_index,
            reason: e.to_string(),
        })?;
        if sha256_hex(&data) != chunk.checksum {
            return Err(TransferError::ChunkChecksum {
                index: chunk.chunk_index,
            });
        }
        self.received_chunks.insert(chunk.chunk_index, data);
        self.status = TransferStatus::InProgress;
        Ok(())
    }

    /// Concatenate chunks by ascending index and check the payload digest.
    fn assemble(&mut self) -> Result<Vec<u8>, TransferError> {
        if !self.is_complete() {
            return Err(TransferError::MissingChunks {
                received: self.chunks_received(),
                total: self.total_chunks,
            });
        }
        // Sized from what arrived; `total_size` is untrusted until checked.
        let received: usize = self.received_chunks.values().map(Vec::len).sum();
        let mut data = Vec::with_capacity(received);
        for chunk in std::mem::take(&mut self.received_chunks).into_values() {
            data.extend_from_slice(&chunk);
        }
        if data.len() as u64 != self.total_size {
            return Err(TransferError::SizeMismatch {
                expected: self.total_size,
                actual: data.len() as u64,
            });
        }
        if sha256_hex(&data) != self.expected_checksum {
            return Err(TransferError::ChecksumVerification);
        }
        Ok(data)
    }
}

/// Reassembles chunked transfers for one receiving endpoint.
pub struct ChunkedTransferReceiver {
    on_complete: CompleteCallback,
    on_error: Option<ErrorCallback>,
    transfers: Mutex<HashMap<String, TransferState>>,
}

impl ChunkedTransferReceiver {
    pub fn new(on_complete: CompleteCallback) -> Self {
        Self {
            on_complete,
            on_error: None,
            transfers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_error_callback(mut self, on_error: ErrorCallback) -> Self {
        self.on_error = Some(on_error);
        self
    }

    fn transfers(&self) -> MutexGuard<'_, HashMap<String, TransferState>> {
        self.transfers.lock().expect("transfer table lock")
    }

    /// Dispatch any transfer message to its handler.
    pub fn handle(&self, message: TransferMessage) {
        match message {
            TransferMessage::Metadata(m) => self.handle_metadata(&m),
            TransferMessage::Chunk(c) => self.handle_chunk(&c),
            TransferMessage::Complete(c) => self.handle_complete(&c),
        }
    }

    /// Start tracking a transfer. Metadata for a known ID restarts it.
    pub fn handle_metadata(&self, metadata: &TransferMetadata) {
        self.register(TransferState::new(
            &metadata.transfer_id,
            metadata.total_size,
            metadata.total_chunks,
            &metadata.checksum,
        ));
    }

    /// RPC flavour of [`handle_metadata`](Self::handle_metadata).
    pub fn initiate(&self, request: &InitiateTransferRequest) -> InitiateTransferResponse {
        self.register(TransferState::new(
            &request.transfer_id,
            request.total_size,
            request.total_chunks,
            &request.checksum,
        ));
        InitiateTransferResponse {
            ready: true,
            message: String::new(),
        }
    }

    fn register(&self, state: TransferState) {
        let id = state.transfer_id.clone();
        let total_chunks = state.total_chunks;
        if self.transfers().insert(id.clone(), state).is_some() {
            warn!(transfer_id = %id, "metadata for known transfer, restarting it");
        } else {
            debug!(transfer_id = %id, total_chunks, "transfer registered");
        }
    }

    /// Verify and store a chunk. Chunks of unknown transfers are ignored.
    pub fn handle_chunk(&self, chunk: &TransferChunk) {
        let failure = {
            let mut transfers = self.transfers();
            let Some(state) = transfers.get_mut(&chunk.transfer_id) else {
                debug!(transfer_id = %chunk.transfer_id, "chunk for unknown transfer ignored");
                return;
            };
            match state.add_chunk(chunk) {
                Ok(()) => None,
                Err(e) => {
                    transfers.remove(&chunk.transfer_id);
                    Some(e)
                }
            }
        };
        if let Some(e) = failure {
            self.fail(&chunk.transfer_id, &e.to_string());
        }
    }

    /// Finish a transfer: verify, assemble and report it, then forget it.
    pub fn handle_complete(&self, complete: &TransferComplete) {
        let Some(mut state) = self.transfers().remove(&complete.transfer_id) else {
            return;
        };

        if !complete.success {
            let reason = TransferError::Aborted(complete.message.clone()).to_string();
            self.fail(&complete.transfer_id, &reason);
            return;
        }

        match state.assemble() {
            Ok(data) => {
                info!(
                    transfer_id = %complete.transfer_id,
                    bytes = data.len(),
                    "chunked transfer completed"
                );
                (self.on_complete)(&complete.transfer_id, data);
            }
            Err(e) => {
                self.fail(&complete.transfer_id, &e.to_string());
            }
        }
    }

    fn fail(&self, transfer_id: &str, reason: &str) {
        warn!(transfer_id = %transfer_id, reason = %reason, "chunked transfer failed");
        if let Some(on_error) = &self.on_error {
            on_error(transfer_id, reason);
        }
    }

    /// `(chunks_received, total_chunks)` of an in-flight transfer.
    pub fn progress(&self, transfer_id: &str) -> Option<(u64, u64)> {
        self.transfers()
            .get(transfer_id)
            .map(|s| (s.chunks_received(), s.total_chunks))
    }

    pub fn status(&self, transfer_id: &str) -> Option<TransferStatus> {
        self.transfers().get(transfer_id).map(|s| s.status)
    }

    /// Number of transfers currently tracked.
    pub fn active_transfers(&self) -> usize {
        self.transfers().len()
    }
}
