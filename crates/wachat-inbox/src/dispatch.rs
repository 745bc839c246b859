// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime dispatch loop.
//!
//! Payloads are taken off the channel one at a time and each is fully
//! ingested before the next is read, so chat updates land in arrival order.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wachat_core::Message;

use crate::ingest::IngestPipeline;

/// What the dispatch loop reports for each payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A payload was stored as this message.
    MessageReceived { message: Message },
    /// A payload was rejected or could not be stored.
    ParseFailed {
        reason: String,
        payload: Option<Value>,
    },
}

/// Counters returned when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: usize,
    pub ingested: usize,
    pub failed: usize,
}

/// Consume payloads from `rx` until the channel closes or `cancel` fires.
///
/// Ingestion errors are turned into [`Notification::ParseFailed`] and never
/// stop the loop. A dropped notification receiver is tolerated.
pub async fn run_dispatch(
    mut rx: mpsc::Receiver<Value>,
    pipeline: Arc<IngestPipeline>,
    notifications: mpsc::Sender<Notification>,
    cancel: CancellationToken,
) -> DispatchStats {
    let mut stats = DispatchStats::default();
    info!("dispatch loop started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("shutdown signal received, stopping dispatch loop");
                break;
            }
            next = rx.recv() => {
                let Some(payload) = next else {
                    debug!("payload channel closed");
                    break;
                };
                stats.received += 1;
                let notification = match pipeline.ingest(&payload).await {
                    Ok(message) => {
                        stats.ingested += 1;
                        Notification::MessageReceived { message }
                    }
                    Err(e) => {
                        stats.failed += 1;
                        Notification::ParseFailed {
                            reason: e.to_string(),
                            payload: e.payload().cloned(),
                        }
                    }
                };
                if notifications.send(notification).await.is_err() {
                    warn!("notification receiver dropped");
                }
            }
        }
    }

    info!(
        received = stats.received,
        ingested = stats.ingested,
        failed = stats.failed,
        "dispatch loop stopped"
    );
    stats
}
