// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wachat sync` command implementation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use wachat_config::WachatConfig;
use wachat_core::WachatError;
use wachat_fastwapi::FastwapiBackend;
use wachat_inbox::{SyncError, SyncOrchestrator};

use crate::inbox::open_store;

/// Pull conversations, histories, and templates from FastWAPI.
pub async fn run_sync(config: &WachatConfig, cancel: CancellationToken) -> Result<(), WachatError> {
    let backend = Arc::new(FastwapiBackend::new(&config.backend)?);
    let opened = open_store(config).await?;
    let orchestrator = SyncOrchestrator::new(backend, Arc::clone(&opened.store), &config.sync);

    let outcome = orchestrator.sync_all(&cancel).await;
    let result = match outcome {
        Ok(report) => {
            println!(
                "synced {} chats and {} messages",
                report.chats, report.messages
            );
            for identity in &report.incomplete {
                println!("history unavailable for {identity}");
            }
            match orchestrator.sync_templates().await {
                Ok(count) => println!("synced {count} templates"),
                Err(e) => warn!(error = %e, "template sync failed"),
            }
            Ok(())
        }
        Err(e) => Err(sync_error(e)),
    };

    opened.close().await?;
    result
}

fn sync_error(e: SyncError) -> WachatError {
    match e {
        SyncError::Total { source } | SyncError::Persistence { source } => source,
        cancelled @ SyncError::Cancelled { .. } => WachatError::Internal(cancelled.to_string()),
    }
}
