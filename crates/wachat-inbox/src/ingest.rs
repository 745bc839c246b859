// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns one raw realtime payload into a stored message and a chat update.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use strum::Display;
use thiserror::Error;
use tracing::{debug, warn};

use wachat_core::{
    ChatUpdate, DeliveryState, Direction, Message, Party, PhoneIdentity, UnreadChange, WachatError,
};

use crate::extractor::{ExtractedFields, extract};
use crate::store::ChatStore;

/// Which required field an incomplete payload lacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MissingField {
    Text,
    Phone,
}

/// Why a payload did not become a message.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Neither text nor phone could be located.
    #[error("payload has neither message text nor sender phone")]
    Unparseable { payload: Value },

    /// Exactly one of text or phone was located, or the phone had no digits.
    #[error("payload is missing the message {missing}")]
    Incomplete { missing: MissingField, payload: Value },

    /// The message was built but could not be persisted.
    #[error("failed to persist ingested message: {0}")]
    Persistence(#[from] WachatError),
}

impl IngestionError {
    /// The offending payload, when the failure was about its content.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Unparseable { payload } | Self::Incomplete { payload, .. } => Some(payload),
            Self::Persistence(_) => None,
        }
    }
}

/// Message ingestion pipeline bound to one chat store.
pub struct IngestPipeline {
    store: Arc<ChatStore>,
}

impl IngestPipeline {
    pub fn new(store: Arc<ChatStore>) -> Self {
        Self { store }
    }

    /// The store this pipeline writes to.
    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }

    /// Extract, normalize, append, and upsert.
    ///
    /// Content failures are logged with the raw payload and returned; they
    /// never panic and never touch the store.
    pub async fn ingest(&self, payload: &Value) -> Result<Message, IngestionError> {
        let fields = extract(payload);
        let name = fields.name.clone();
        let (message, identity) = match build_message(fields, payload) {
            Ok(built) => built,
            Err(err) => {
                warn!(error = %err, payload = %payload, "inbound payload rejected");
                return Err(err);
            }
        };

        let mut update = ChatUpdate::new(identity.as_str())
            .last_message(message.text.clone(), message.timestamp)
            .presence(true)
            .unread(UnreadChange::Increment);
        update.display_name = name;

        self.store.append_message(message.clone()).await?;
        let chat = self.store.upsert(update).await?;
        debug!(
            identity = %chat.identity,
            message_id = %message.id,
            unread = chat.unread_count,
            "inbound message ingested"
        );
        Ok(message)
    }
}

fn build_message(
    fields: ExtractedFields,
    payload: &Value,
) -> Result<(Message, PhoneIdentity), IngestionError> {
    let (text, phone) = match (fields.text, fields.phone) {
        (None, None) => {
            return Err(IngestionError::Unparseable {
                payload: payload.clone(),
            });
        }
        (None, Some(_)) => {
            return Err(IngestionError::Incomplete {
                missing: MissingField::Text,
                payload: payload.clone(),
            });
        }
        (Some(_), None) => {
            return Err(IngestionError::Incomplete {
                missing: MissingField::Phone,
                payload: payload.clone(),
            });
        }
        (Some(text), Some(phone)) => (text, phone),
    };

    let identity = PhoneIdentity::normalize(&phone);
    if !identity.has_digits() {
        return Err(IngestionError::Incomplete {
            missing: MissingField::Phone,
            payload: payload.clone(),
        });
    }

    let message = Message {
        id: fields
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        contact_name: fields.name.unwrap_or_else(|| identity.to_string()),
        from: Party::Contact(identity.clone()),
        to: Party::Business,
        text,
        timestamp: fields.timestamp.unwrap_or_else(Utc::now),
        direction: Direction::Received,
        delivery_state: DeliveryState::Delivered,
    };
    Ok((message, identity))
}
