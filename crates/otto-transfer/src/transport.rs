//! Message transports the sender publishes through.
//!
//! The protocol only needs `publish(topic, message)`. Two transports ship
//! with the crate: an in-process channel and a JSON-lines file writer
//! (one envelope per line) used by the CLI.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{Mutex, mpsc};

use crate::error::{TransferError, TransferResult};
use crate::message::TransferMessage;
use crate::receiver::ChunkedTransferReceiver;

/// A published message together with its topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    pub message: TransferMessage,
}

/// Publish side of a message bus.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn publish(&self, topic: &str, message: &TransferMessage) -> TransferResult<()>;
}

/// In-process transport backed by an unbounded channel. Delivery is in
/// publish order.
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl MessageTransport for ChannelTransport {
    async fn publish(&self, topic: &str, message: &TransferMessage) -> TransferResult<()> {
        self.tx
            .send(Envelope {
                topic: topic.to_string(),
                message: message.clone(),
            })
            .map_err(|_| TransferError::Publish {
                topic: topic.to_string(),
                reason: "channel closed".to_string(),
            })
    }
}

/// Feed every envelope from `rx` into `receiver` until the channel closes.
/// Returns the number of envelopes delivered.
pub async fn deliver(
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    receiver: &ChunkedTransferReceiver,
) -> usize {
    let mut delivered = 0;
    while let Some(envelope) = rx.recv().await {
        receiver.handle(envelope.message);
        delivered += 1;
    }
    delivered
}

/// Appends envelopes to a file, one JSON object per line.
pub struct JsonLinesTransport {
    writer: Mutex<BufWriter<tokio::fs::File>>,
}

impl JsonLinesTransport {
    pub async fn create(path: &Path) -> TransferResult<Self> {
        let file = tokio::fs::File::create(path).await?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub async fn flush(&self) -> TransferResult<()> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl MessageTransport for JsonLinesTransport {
    async fn publish(&self, topic: &str, message: &TransferMessage) -> TransferResult<()> {
        let envelope = Envelope {
            topic: topic.to_string(),
            message: message.clone(),
        };
        let mut line =
            serde_json::to_vec(&envelope).map_err(|e| TransferError::Encode(e.to_string()))?;
        line.push(b'\n');
        self.writer.lock().await.write_all(&line).await?;
        Ok(())
    }
}

/// Read back a file written by [`JsonLinesTransport`]. Blank lines are
/// skipped.
pub async fn read_envelopes(path: &Path) -> TransferResult<Vec<Envelope>> {
    let content = tokio::fs::read_to_string(path).await?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| TransferError::Malformed(e.to_string()))
        })
        .collect()
}
