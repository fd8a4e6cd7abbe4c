use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use otto_transfer::{ChunkedTransferReceiver, ChunkedTransferSender, JsonLinesTransport, read_envelopes};
use tracing::info;

use super::load_config;

pub async fn send(
    input: &Path,
    output: &Path,
    chunk_size: Option<usize>,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let mut settings = load_config(config)?.transfer_settings();
    if let Some(size) = chunk_size {
        settings.chunk_size = size;
    }

    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let transport = Arc::new(JsonLinesTransport::create(output).await?);
    let sender = ChunkedTransferSender::new(transport.clone(), settings)?;
    let prefix = sender.settings().topic_prefix.clone();

    let transfer_id = sender
        .send_to(&data, &prefix, |sent, total| {
            if sent == total || sent % 64 == 0 {
                info!(sent, total, "progress");
            }
        })
        .await?;
    transport.flush().await?;

    println!("✓ Wrote transfer {transfer_id}");
    println!("  Bytes:    {}", data.len());
    println!("  Messages: {}", output.display());
    Ok(())
}

pub async fn receive(messages: &Path, output: &Path) -> anyhow::Result<()> {
    let (transfer_id, payload) = replay(messages).await?;
    tokio::fs::write(output, &payload)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("✓ Received transfer {transfer_id}");
    println!("  Bytes:  {}", payload.len());
    println!("  Output: {}", output.display());
    Ok(())
}

type Outcome = Arc<Mutex<Option<Result<(String, Vec<u8>), String>>>>;

/// Feed a JSON-lines message log into a receiver and return the first
/// transfer that completes, or the first failure reported.
pub async fn replay(messages: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    let envelopes = read_envelopes(messages).await?;

    let outcome: Outcome = Arc::default();
    let on_complete = outcome.clone();
    let on_error = outcome.clone();
    let receiver = ChunkedTransferReceiver::new(Box::new(move |id: &str, payload: Vec<u8>| {
        on_complete
            .lock()
            .expect("outcome lock")
            .get_or_insert(Ok((id.to_string(), payload)));
    }))
    .with_error_callback(Box::new(move |id: &str, reason: &str| {
        on_error
            .lock()
            .expect("outcome lock")
            .get_or_insert(Err(format!("transfer {id}: {reason}")));
    }));

    for envelope in envelopes {
        receiver.handle(envelope.message);
    }

    let result = outcome.lock().expect("outcome lock").take();
    match result {
        Some(Ok(done)) => Ok(done),
        Some(Err(reason)) => anyhow::bail!(reason),
        None => anyhow::bail!("{} holds no completed transfer", messages.display()),
    }
}
