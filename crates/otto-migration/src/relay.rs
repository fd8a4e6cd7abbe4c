//! Chunked hop for migration payloads.
//!
//! Sends an export payload through the chunked transfer protocol over an
//! in-process channel and hands back what the receiver verified, so the
//! same integrity checks apply as when the payload crosses a message bus.

use std::sync::{Arc, Mutex};

use otto_core::TransferSettings;
use otto_transfer::{ChannelTransport, ChunkedTransferReceiver, ChunkedTransferSender, deliver};
use tracing::debug;

use crate::error::{MigrationError, Result};

type Outcome = Arc<Mutex<Option<std::result::Result<Vec<u8>, String>>>>;

/// Move `data` through a sender/receiver pair and return the verified
/// payload.
pub async fn relay_chunked(data: &[u8], settings: &TransferSettings) -> Result<Vec<u8>> {
    let (transport, rx) = ChannelTransport::new();
    let sender = ChunkedTransferSender::new(Arc::new(transport), settings.clone())
        .map_err(|e| MigrationError::Transfer(e.to_string()))?;

    let outcome: Outcome = Arc::default();
    let on_complete = outcome.clone();
    let on_error = outcome.clone();
    let receiver = ChunkedTransferReceiver::new(Box::new(move |_: &str, payload: Vec<u8>| {
        *on_complete.lock().expect("relay outcome lock") = Some(Ok(payload));
    }))
    .with_error_callback(Box::new(move |_: &str, reason: &str| {
        *on_error.lock().expect("relay outcome lock") = Some(Err(reason.to_string()));
    }));

    let transfer_id = sender
        .send(data)
        .await
        .map_err(|e| MigrationError::Transfer(e.to_string()))?;
    drop(sender);
    let delivered = deliver(rx, &receiver).await;
    debug!(transfer_id = %transfer_id, messages = delivered, "chunked relay drained");

    let result = outcome.lock().expect("relay outcome lock").take();
    match result {
        Some(Ok(payload)) => Ok(payload),
        Some(Err(reason)) => Err(MigrationError::Transfer(reason)),
        None => Err(MigrationError::Transfer(format!(
            "transfer {transfer_id} finished without an outcome"
        ))),
    }
}
