// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wachat ingest` command implementation.
//!
//! Reads newline-delimited JSON payloads from a file or stdin and feeds them
//! through the realtime dispatch loop, printing one line per outcome.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wachat_config::WachatConfig;
use wachat_core::WachatError;
use wachat_inbox::{DispatchStats, IngestPipeline, Notification, run_dispatch};

use crate::inbox::open_store;

/// Run the `wachat ingest` command.
///
/// The input is opened before the store, so a missing file leaves nothing
/// running. The store is closed whether or not feeding succeeds.
pub async fn run_ingest(
    config: &WachatConfig,
    file: Option<&Path>,
    cancel: CancellationToken,
) -> Result<DispatchStats, WachatError> {
    let input = match file {
        Some(path) => Some(tokio::fs::File::open(path).await.map_err(|e| {
            WachatError::Internal(format!("cannot open {}: {e}", path.display()))
        })?),
        None => None,
    };

    let opened = open_store(config).await?;
    let pipeline = Arc::new(IngestPipeline::new(Arc::clone(&opened.store)));

    let capacity = config.ingest.queue_capacity;
    let (tx, rx) = mpsc::channel(capacity);
    let (notify_tx, mut notify_rx) = mpsc::channel(capacity);

    let dispatch = tokio::spawn(run_dispatch(rx, pipeline, notify_tx, cancel.clone()));
    let printer = tokio::spawn(async move {
        while let Some(notification) = notify_rx.recv().await {
            println!("{}", describe(&notification));
        }
    });

    let fed = match input {
        Some(file) => feed_lines(BufReader::new(file), &tx, &cancel).await,
        None => feed_lines(BufReader::new(tokio::io::stdin()), &tx, &cancel).await,
    };
    drop(tx);

    let joined = dispatch
        .await
        .map_err(|e| WachatError::Internal(format!("dispatch task failed: {e}")));
    let _ = printer.await;
    opened.close().await?;

    let skipped = fed?;
    let stats = joined?;
    info!(
        received = stats.received,
        ingested = stats.ingested,
        failed = stats.failed,
        skipped,
        "ingest finished"
    );
    eprintln!(
        "wachat: {} ingested, {} rejected, {} unreadable lines",
        stats.ingested, stats.failed, skipped
    );
    Ok(stats)
}

/// Send each non-blank JSON line into `tx`. Returns the number of lines
/// that were not valid JSON.
async fn feed_lines<R: AsyncBufRead + Unpin>(
    reader: R,
    tx: &mpsc::Sender<Value>,
    cancel: &CancellationToken,
) -> Result<usize, WachatError> {
    let mut lines = reader.lines();
    let mut skipped = 0;
    let mut line_no = 0usize;

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        let Some(line) = line.map_err(|e| WachatError::Internal(format!("read failed: {e}")))?
        else {
            break;
        };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(payload) => {
                if tx.send(payload).await.is_err() {
                    debug!("dispatch loop stopped accepting payloads");
                    break;
                }
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping line that is not JSON");
                skipped += 1;
            }
        }
    }
    Ok(skipped)
}

fn describe(notification: &Notification) -> String {
    match notification {
        Notification::MessageReceived { message } => format!(
            "received {} from {}: {}",
            message.id, message.contact_name, message.text
        ),
        Notification::ParseFailed { reason, .. } => format!("rejected: {reason}"),
    }
}
