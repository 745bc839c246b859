// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message normalization and chat reconciliation.
//!
//! Raw realtime payloads flow through [`extractor::extract`] and
//! [`IngestPipeline`] into the [`ChatStore`], which also receives
//! authoritative snapshots from the [`SyncOrchestrator`]. The store is the
//! single writer of all persisted chat state.

pub mod dispatch;
pub mod extractor;
pub mod ingest;
pub mod store;
pub mod sync;

pub use dispatch::{DispatchStats, Notification, run_dispatch};
pub use extractor::{ExtractedFields, extract};
pub use ingest::{IngestPipeline, IngestionError, MissingField};
pub use store::ChatStore;
pub use sync::{SyncError, SyncOrchestrator, SyncReport};
