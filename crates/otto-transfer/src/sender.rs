//! Sending side of the chunked transfer protocol.

use std::sync::Arc;

use otto_core::TransferSettings;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{TransferError, TransferResult};
use crate::message::{TransferChunk, TransferComplete, TransferMessage, TransferMetadata, sha256_hex};
use crate::transport::MessageTransport;

/// Splits payloads into checksummed chunks and publishes them as
/// metadata → chunks (in index order) → completion.
pub struct ChunkedTransferSender {
    transport: Arc<dyn MessageTransport>,
    settings: TransferSettings,
}

impl ChunkedTransferSender {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        settings: TransferSettings,
    ) -> TransferResult<Self> {
        if settings.chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize);
        }
        Ok(Self {
            transport,
            settings,
        })
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Build the metadata and chunk messages for `data` under a fresh
    /// transfer ID, without publishing anything.
    pub fn prepare(&self, data: &[u8]) -> (String, TransferMetadata, Vec<TransferChunk>) {
        let transfer_id = Uuid::new_v4().to_string();
        let chunk_size = self.settings.chunk_size;
        let total_chunks = data.len().div_ceil(chunk_size) as u64;

        let metadata = TransferMetadata {
            transfer_id: transfer_id.clone(),
            total_size: data.len() as u64,
            total_chunks,
            checksum: sha256_hex(data),
            content_type: self.settings.content_type.clone(),
        };

        let chunks = data
            .chunks(chunk_size)
            .enumerate()
            .map(|(i, raw)| TransferChunk::new(&transfer_id, i as u64, total_chunks, raw))
            .collect();

        (transfer_id, metadata, chunks)
    }

    /// Send `data` under the configured topic prefix.
    pub async fn send(&self, data: &[u8]) -> TransferResult<String> {
        let prefix = self.settings.topic_prefix.clone();
        self.send_to(data, &prefix, |_, _| {}).await
    }

    /// Send `data` under `topic_prefix`, calling `on_progress(sent, total)`
    /// after each chunk. Returns the transfer ID.
    pub async fn send_to<F>(
        &self,
        data: &[u8],
        topic_prefix: &str,
        mut on_progress: F,
    ) -> TransferResult<String>
    where
        F: FnMut(u64, u64) + Send,
    {
        let (transfer_id, metadata, chunks) = self.prepare(data);
        let total = metadata.total_chunks;

        info!(
            transfer_id = %transfer_id,
            bytes = metadata.total_size,
            chunks = total,
            topic = %topic_prefix,
            "starting chunked transfer"
        );

        self.publish(topic_prefix, TransferMessage::Metadata(metadata))
            .await?;

        for (i, chunk) in chunks.into_iter().enumerate() {
            self.publish(topic_prefix, TransferMessage::Chunk(chunk)).await?;
            let sent = i as u64 + 1;
            debug!(transfer_id = %transfer_id, sent, total, "chunk sent");
            on_progress(sent, total);
        }

        self.publish(
            topic_prefix,
            TransferMessage::Complete(TransferComplete {
                transfer_id: transfer_id.clone(),
                success: true,
                message: String::new(),
            }),
        )
        .await?;

        info!(transfer_id = %transfer_id, "chunked transfer sent");
        Ok(transfer_id)
    }

    async fn publish(&self, prefix: &str, message: TransferMessage) -> TransferResult<()> {
        let topic = message.topic(prefix);
        self.transport.publish(&topic, &message).await
    }
}
