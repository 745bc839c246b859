// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value persistence contract.
//!
//! Values are JSON strings. Implementations must make a `set` durable (or
//! fail) before returning; the chat store relies on that to report
//! persistence failures to its caller.

use async_trait::async_trait;

use crate::error::WachatError;
use crate::traits::adapter::PluginAdapter;

/// Well-known keys owned by the chat store.
pub mod keys {
    /// Ordered chat collection.
    pub const CHATS: &str = "wa_chats";
    /// Append-only message log.
    pub const MESSAGES: &str = "wa_messages";
    /// Template records from the last template sync.
    pub const TEMPLATES: &str = "wa_templates";
    /// RFC 3339 timestamp of the last successful bulk sync.
    pub const LAST_SYNC: &str = "wa_last_sync";
}

/// A string-keyed store of JSON string values.
#[async_trait]
pub trait KeyValueStore: PluginAdapter {
    /// Reads a value, `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, WachatError>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), WachatError>;

    /// Deletes a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), WachatError>;
}
