// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the ingestion, reconciliation, and sync layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::phone::PhoneIdentity;

/// String used to represent the business itself in persisted messages.
pub const BUSINESS_SENTINEL: &str = "me";

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Backend,
}

/// One side of a conversation: the business account or a contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Party {
    Business,
    Contact(PhoneIdentity),
}

impl Party {
    /// The contact identity, or `None` for the business sentinel.
    pub fn identity(&self) -> Option<&PhoneIdentity> {
        match self {
            Party::Business => None,
            Party::Contact(id) => Some(id),
        }
    }
}

impl From<String> for Party {
    fn from(raw: String) -> Self {
        if raw == BUSINESS_SENTINEL {
            Party::Business
        } else {
            Party::Contact(PhoneIdentity::normalize(&raw))
        }
    }
}

impl From<Party> for String {
    fn from(party: Party) -> Self {
        match party {
            Party::Business => BUSINESS_SENTINEL.to_string(),
            Party::Contact(id) => id.into(),
        }
    }
}

/// Whether a message was received from a contact or sent by the business.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Received,
    Sent,
}

/// Delivery progress of a message. Only meaningful for sent messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryState {
    Sending,
    Sent,
    Delivered,
    Failed,
}

impl DeliveryState {
    /// `Delivered` and `Failed` accept no further transitions.
    pub fn is_final(self) -> bool {
        matches!(self, DeliveryState::Delivered | DeliveryState::Failed)
    }

    /// Forward-only transitions: `sending -> sent -> delivered`, and any
    /// non-final state may fail.
    pub fn can_transition_to(self, next: DeliveryState) -> bool {
        use DeliveryState::*;
        match (self, next) {
            (Sending, Sent) | (Sending, Delivered) | (Sent, Delivered) => true,
            (current, Failed) => !current.is_final(),
            _ => false,
        }
    }
}

/// One unit of conversation content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub from: Party,
    pub to: Party,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub delivery_state: DeliveryState,
    pub contact_name: String,
}

impl Message {
    /// Builds an outbound message in the `sending` state.
    ///
    /// This is the shape an outbound send flow hands to the chat store so it
    /// lands in the same log as inbound traffic.
    pub fn outbound(to: PhoneIdentity, text: impl Into<String>, contact_name: Option<String>) -> Self {
        let contact_name = contact_name.unwrap_or_else(|| to.to_string());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: Party::Business,
            to: Party::Contact(to),
            text: text.into(),
            timestamp: Utc::now(),
            direction: Direction::Sent,
            delivery_state: DeliveryState::Sending,
            contact_name,
        }
    }

    /// The non-business party of this message.
    pub fn counterpart(&self) -> Option<&PhoneIdentity> {
        match self.direction {
            Direction::Received => self.from.identity(),
            Direction::Sent => self.to.identity(),
        }
    }
}

/// One conversation thread, keyed by [`PhoneIdentity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub identity: PhoneIdentity,
    pub display_name: String,
    #[serde(default)]
    pub last_message_preview: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub avatar_initials: String,
    #[serde(default)]
    pub presence: bool,
}

impl Chat {
    /// Creates an empty chat. The display name falls back to the identity string.
    pub fn new(identity: PhoneIdentity, display_name: Option<String>) -> Self {
        let display_name = display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| identity.to_string());
        let avatar_initials = avatar_initials(&display_name);
        Self {
            identity,
            display_name,
            last_message_preview: None,
            last_message_time: None,
            unread_count: 0,
            avatar_initials,
            presence: false,
        }
    }

    /// Replaces the display name and recomputes the avatar initials.
    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
        self.avatar_initials = avatar_initials(&self.display_name);
    }
}

/// Derives avatar initials from a display name.
///
/// Takes the first alphanumeric character of each of the first two words,
/// uppercased. Names without any alphanumeric word yield `#`.
pub fn avatar_initials(display_name: &str) -> String {
    let initials: String = display_name
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphanumeric()))
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if initials.is_empty() {
        "#".to_string()
    } else {
        initials
    }
}

/// How an upsert treats the unread counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnreadChange {
    /// Keep the current count (new chats start at zero).
    #[default]
    Preserve,
    /// Add one, unless the chat is the active one.
    Increment,
    /// Set to zero.
    Reset,
    /// Set to an explicit value.
    Set(u32),
}

/// A partial chat update accepted by the reconciliation store.
///
/// `identity` is the raw phone string as the caller saw it; the store
/// normalizes it before lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatUpdate {
    pub identity: String,
    pub display_name: Option<String>,
    pub last_message_preview: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub presence: Option<bool>,
    pub unread: UnreadChange,
}

impl ChatUpdate {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Self::default()
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn last_message(mut self, preview: impl Into<String>, time: DateTime<Utc>) -> Self {
        self.last_message_preview = Some(preview.into());
        self.last_message_time = Some(time);
        self
    }

    pub fn presence(mut self, online: bool) -> Self {
        self.presence = Some(online);
        self
    }

    pub fn unread(mut self, change: UnreadChange) -> Self {
        self.unread = change;
        self
    }
}

/// A conversation as listed by the vendor backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub identity: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_count: u32,
}

/// One history entry as returned by the vendor backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendMessage {
    pub text: String,
    pub from_is_contact: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub id: Option<String>,
}
