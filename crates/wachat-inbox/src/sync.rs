// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk sync from the vendor backend.
//!
//! A sync pass is authoritative: the conversation list and every history it
//! names are fetched into memory first, and only a complete pass replaces
//! the store's chats and messages. A failure to list conversations, a
//! cancellation, or a failed write leaves the previous state in place.
//! Individual history failures do not abort the pass; the affected chats are
//! kept with the backend's preview data and reported as incomplete.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wachat_config::model::SyncConfig;
use wachat_core::template::extract_variables;
use wachat_core::traits::VendorBackend;
use wachat_core::{
    BackendMessage, Chat, ConversationSummary, DeliveryState, Direction, Message, Party,
    PhoneIdentity, WachatError,
};

use crate::store::ChatStore;

/// Outcome of a committed sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Chats written to the store.
    pub chats: usize,
    /// Messages written to the store.
    pub messages: usize,
    /// Conversations whose history could not be fetched.
    pub incomplete: Vec<PhoneIdentity>,
}

impl SyncReport {
    /// True when at least one history fetch failed.
    pub fn is_partial(&self) -> bool {
        !self.incomplete.is_empty()
    }
}

/// Why a sync pass committed nothing.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to list conversations: {source}")]
    Total {
        #[source]
        source: WachatError,
    },

    #[error("sync cancelled after {fetched} of {total} conversations")]
    Cancelled { fetched: usize, total: usize },

    #[error("failed to persist sync result: {source}")]
    Persistence {
        #[source]
        source: WachatError,
    },
}

/// Pulls conversations, histories, and templates from a [`VendorBackend`]
/// into a [`ChatStore`].
pub struct SyncOrchestrator {
    backend: Arc<dyn VendorBackend>,
    store: Arc<ChatStore>,
    request_delay: Duration,
}

impl SyncOrchestrator {
    pub fn new(backend: Arc<dyn VendorBackend>, store: Arc<ChatStore>, config: &SyncConfig) -> Self {
        Self::with_request_delay(
            backend,
            store,
            Duration::from_millis(config.request_delay_ms),
        )
    }

    /// Build with an explicit pause between history requests.
    pub fn with_request_delay(
        backend: Arc<dyn VendorBackend>,
        store: Arc<ChatStore>,
        request_delay: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            request_delay,
        }
    }

    /// Fetch everything and replace the store's chats and messages.
    pub async fn sync_all(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        let listed = self.backend.list_conversations().await.map_err(|source| {
            warn!(error = %source, "conversation listing failed, nothing synced");
            SyncError::Total { source }
        })?;
        let conversations = unique_conversations(listed);
        let total = conversations.len();
        info!(conversations = total, "sync started");

        let now = Utc::now();
        let mut chats = Vec::with_capacity(total);
        let mut messages = Vec::new();
        let mut incomplete = Vec::new();

        for (index, (identity, summary)) in conversations.into_iter().enumerate() {
            if index > 0 && !self.request_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.request_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                info!(fetched = index, total, "sync cancelled, nothing committed");
                return Err(SyncError::Cancelled {
                    fetched: index,
                    total,
                });
            }

            let history: Vec<Message> = match self.backend.list_messages(&identity).await {
                Ok(history) => {
                    debug!(identity = %identity, messages = history.len(), "history fetched");
                    history
                        .into_iter()
                        .filter_map(|m| map_message(&identity, &summary, m, now))
                        .collect()
                }
                Err(e) => {
                    warn!(identity = %identity, error = %e, "history fetch failed, keeping preview");
                    incomplete.push(identity.clone());
                    Vec::new()
                }
            };

            chats.push(chat_from_summary(identity, summary, &history));
            messages.extend(history);
        }

        messages.sort_by_key(|m| m.timestamp);

        let report = SyncReport {
            chats: chats.len(),
            messages: messages.len(),
            incomplete,
        };
        self.store
            .replace_all(chats, messages, Utc::now())
            .await
            .map_err(|source| SyncError::Persistence { source })?;

        info!(
            chats = report.chats,
            messages = report.messages,
            incomplete = report.incomplete.len(),
            "sync complete"
        );
        Ok(report)
    }

    /// Replace the stored template collection. Returns the template count.
    pub async fn sync_templates(&self) -> Result<usize, SyncError> {
        let mut templates = self
            .backend
            .list_templates()
            .await
            .map_err(|source| SyncError::Total { source })?;
        for template in &mut templates {
            if template.variables.is_empty() {
                template.variables = extract_variables(&template.content);
            }
        }
        let count = templates.len();
        self.store
            .replace_templates(templates)
            .await
            .map_err(|source| SyncError::Persistence { source })?;
        info!(templates = count, "templates synced");
        Ok(count)
    }
}

/// Normalize listed identities, dropping digit-less ones and repeats.
fn unique_conversations(listed: Vec<ConversationSummary>) -> Vec<(PhoneIdentity, ConversationSummary)> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(listed.len());
    for summary in listed {
        let identity = PhoneIdentity::normalize(&summary.identity);
        if !identity.has_digits() {
            warn!(identity = %summary.identity, "conversation without a phone number skipped");
            continue;
        }
        if !seen.insert(identity.clone()) {
            debug!(identity = %identity, "repeated conversation skipped");
            continue;
        }
        unique.push((identity, summary));
    }
    unique
}

fn map_message(
    identity: &PhoneIdentity,
    summary: &ConversationSummary,
    message: BackendMessage,
    now: DateTime<Utc>,
) -> Option<Message> {
    if message.text.trim().is_empty() {
        debug!(identity = %identity, id = ?message.id, "history entry without text dropped");
        return None;
    }
    let contact = Party::Contact(identity.clone());
    let (from, to, direction, delivery_state) = if message.from_is_contact {
        (contact, Party::Business, Direction::Received, DeliveryState::Delivered)
    } else {
        (Party::Business, contact, Direction::Sent, DeliveryState::Sent)
    };
    Some(Message {
        id: message
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        from,
        to,
        text: message.text,
        timestamp: message.timestamp.unwrap_or(now),
        direction,
        delivery_state,
        contact_name: summary
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| identity.to_string()),
    })
}

fn chat_from_summary(
    identity: PhoneIdentity,
    summary: ConversationSummary,
    history: &[Message],
) -> Chat {
    let mut chat = Chat::new(identity, summary.name);
    chat.unread_count = summary.unread_count;
    let latest = history.iter().max_by_key(|m| m.timestamp);
    chat.last_message_preview = summary
        .last_message
        .filter(|preview| !preview.trim().is_empty())
        .or_else(|| latest.map(|m| m.text.clone()));
    chat.last_message_time = summary
        .last_message_time
        .or_else(|| latest.map(|m| m.timestamp));
    chat
}
