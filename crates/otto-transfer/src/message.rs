//! Wire messages of the chunked transfer protocol.
//!
//! A transfer is one [`TransferMetadata`], N [`TransferChunk`]s and one
//! [`TransferComplete`], each published as a discrete message. Chunk
//! payloads travel base64-encoded so they survive text-only transports.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Announces a transfer. Must be observed before any of its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMetadata {
    pub transfer_id: String,
    pub total_size: u64,
    pub total_chunks: u64,
    /// SHA-256 (hex) of the complete payload.
    pub checksum: String,
    pub content_type: String,
}

/// One fragment of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferChunk {
    pub transfer_id: String,
    /// 0-based, `< total_chunks`.
    pub chunk_index: u64,
    pub total_chunks: u64,
    /// Base64 of the raw chunk bytes.
    pub data: String,
    /// SHA-256 (hex) of the raw chunk bytes.
    pub checksum: String,
}

impl TransferChunk {
    pub fn new(transfer_id: &str, chunk_index: u64, total_chunks: u64, raw: &[u8]) -> Self {
        Self {
            transfer_id: transfer_id.to_string(),
            chunk_index,
            total_chunks,
            data: STANDARD.encode(raw),
            checksum: sha256_hex(raw),
        }
    }

    /// Decode the transport encoding back to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// Terminal signal of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferComplete {
    pub transfer_id: String,
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Any of the three transfer messages, tagged for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferMessage {
    Metadata(TransferMetadata),
    Chunk(TransferChunk),
    Complete(TransferComplete),
}

impl TransferMessage {
    pub fn transfer_id(&self) -> &str {
        match self {
            TransferMessage::Metadata(m) => &m.transfer_id,
            TransferMessage::Chunk(c) => &c.transfer_id,
            TransferMessage::Complete(c) => &c.transfer_id,
        }
    }

    /// Topic suffix for this kind of message.
    pub fn kind(&self) -> &'static str {
        match self {
            TransferMessage::Metadata(_) => "metadata",
            TransferMessage::Chunk(_) => "chunk",
            TransferMessage::Complete(_) => "complete",
        }
    }

    /// Full topic under `prefix`, e.g. `otto/migration/chunk`.
    pub fn topic(&self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.kind())
    }
}

/// RPC request announcing a transfer ahead of its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiateTransferRequest {
    pub transfer_id: String,
    pub total_size: u64,
    pub total_chunks: u64,
    pub checksum: String,
}

impl From<&TransferMetadata> for InitiateTransferRequest {
    fn from(m: &TransferMetadata) -> Self {
        Self {
            transfer_id: m.transfer_id.clone(),
            total_size: m.total_size,
            total_chunks: m.total_chunks,
            checksum: m.checksum.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiateTransferResponse {
    pub ready: bool,
    #[serde(default)]
    pub message: String,
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_encodes_and_checksums_raw_bytes() {
        let raw = [0u8, 159, 146, 150, 255];
        let chunk = TransferChunk::new("t1", 0, 1, &raw);
        assert_eq!(chunk.data, "AJ+Slv8=");
        assert_eq!(chunk.checksum, sha256_hex(&raw));
        assert_eq!(chunk.decode().unwrap(), raw);
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn messages_are_tagged_on_the_wire() {
        let msg = TransferMessage::Complete(TransferComplete {
            transfer_id: "t1".to_string(),
            success: true,
            message: String::new(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["transfer_id"], "t1");

        let back: TransferMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn topics_hang_off_prefix() {
        let msg = TransferMessage::Chunk(TransferChunk::new("t1", 0, 1, b"x"));
        assert_eq!(msg.topic("otto/nodes/n2/migration/"), "otto/nodes/n2/migration/chunk");
        assert_eq!(msg.transfer_id(), "t1");
    }
}
