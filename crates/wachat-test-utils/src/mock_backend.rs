// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock vendor backend with scripted responses.
//!
//! Conversations, per-conversation histories, and templates are configured
//! up front. Individual histories (or the conversation list itself) can be
//! scripted to fail, and every history fetch is recorded for assertions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use wachat_core::traits::{PluginAdapter, VendorBackend};
use wachat_core::types::{
    AdapterType, BackendMessage, ConversationSummary, HealthStatus,
};
use wachat_core::{PhoneIdentity, TemplateRecord, WachatError};

#[derive(Default)]
struct Script {
    conversations: Vec<ConversationSummary>,
    conversations_error: Option<String>,
    histories: HashMap<PhoneIdentity, Result<Vec<BackendMessage>, String>>,
    templates: Vec<TemplateRecord>,
    fetched: Vec<PhoneIdentity>,
    cancel_after: Option<(usize, CancellationToken)>,
}

/// A vendor backend that serves scripted data.
#[derive(Clone, Default)]
pub struct MockBackend {
    script: Arc<Mutex<Script>>,
}

impl MockBackend {
    /// Create a backend with no conversations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a conversation to the listing.
    pub async fn add_conversation(&self, summary: ConversationSummary) {
        self.script.lock().await.conversations.push(summary);
    }

    /// Make `list_conversations` fail with `message`.
    pub async fn fail_conversations(&self, message: &str) {
        self.script.lock().await.conversations_error = Some(message.to_string());
    }

    /// Script the history returned for `identity`.
    pub async fn set_history(&self, identity: &str, messages: Vec<BackendMessage>) {
        self.script
            .lock()
            .await
            .histories
            .insert(PhoneIdentity::normalize(identity), Ok(messages));
    }

    /// Make the history fetch for `identity` fail with `message`.
    pub async fn fail_history(&self, identity: &str, message: &str) {
        self.script
            .lock()
            .await
            .histories
            .insert(PhoneIdentity::normalize(identity), Err(message.to_string()));
    }

    /// Replace the template listing.
    pub async fn set_templates(&self, templates: Vec<TemplateRecord>) {
        self.script.lock().await.templates = templates;
    }

    /// Cancel `token` once `fetches` history requests have been served.
    pub async fn cancel_after(&self, fetches: usize, token: CancellationToken) {
        self.script.lock().await.cancel_after = Some((fetches, token));
    }

    /// Identities whose history was requested, in request order.
    pub async fn fetched(&self) -> Vec<PhoneIdentity> {
        self.script.lock().await.fetched.clone()
    }

    /// Build a conversation summary with only identity and name set.
    pub fn summary(identity: &str, name: Option<&str>) -> ConversationSummary {
        ConversationSummary {
            identity: identity.to_string(),
            name: name.map(str::to_string),
            last_message: None,
            last_message_time: None,
            unread_count: 0,
        }
    }

    /// Build a backend history entry.
    pub fn message(
        text: &str,
        from_is_contact: bool,
        timestamp: Option<chrono::DateTime<chrono::Utc>>,
    ) -> BackendMessage {
        BackendMessage {
            text: text.to_string(),
            from_is_contact,
            timestamp,
            id: None,
        }
    }
}

#[async_trait]
impl PluginAdapter for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, WachatError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WachatError> {
        Ok(())
    }
}

#[async_trait]
impl VendorBackend for MockBackend {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, WachatError> {
        let script = self.script.lock().await;
        match &script.conversations_error {
            Some(message) => Err(WachatError::backend(message.clone())),
            None => Ok(script.conversations.clone()),
        }
    }

    async fn list_messages(
        &self,
        identity: &PhoneIdentity,
    ) -> Result<Vec<BackendMessage>, WachatError> {
        let mut script = self.script.lock().await;
        script.fetched.push(identity.clone());
        let served = script.fetched.len();
        if let Some((after, token)) = &script.cancel_after {
            if served >= *after {
                token.cancel();
            }
        }
        match script.histories.get(identity) {
            Some(Ok(messages)) => Ok(messages.clone()),
            Some(Err(message)) => Err(WachatError::backend(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn list_templates(&self) -> Result<Vec<TemplateRecord>, WachatError> {
        Ok(self.script.lock().await.templates.clone())
    }
}
