// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vendor backend that proxies conversations, history, and templates.

use async_trait::async_trait;

use crate::error::WachatError;
use crate::phone::PhoneIdentity;
use crate::template::TemplateRecord;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BackendMessage, ConversationSummary};

/// Read-only access to the vendor's view of the business inbox.
#[async_trait]
pub trait VendorBackend: PluginAdapter {
    /// Lists every conversation known to the backend.
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, WachatError>;

    /// Fetches the full history of one conversation, oldest first when the
    /// backend orders it at all.
    async fn list_messages(
        &self,
        identity: &PhoneIdentity,
    ) -> Result<Vec<BackendMessage>, WachatError>;

    /// Lists the approved message templates.
    async fn list_templates(&self) -> Result<Vec<TemplateRecord>, WachatError>;
}
