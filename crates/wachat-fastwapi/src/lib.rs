// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FastWAPI vendor backend adapter.
//!
//! This crate implements [`VendorBackend`] over the FastWAPI REST API,
//! which proxies conversation listings, per-conversation history, and
//! message templates.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use wachat_config::model::BackendConfig;
use wachat_core::traits::{PluginAdapter, VendorBackend};
use wachat_core::types::{AdapterType, BackendMessage, ConversationSummary, HealthStatus};
use wachat_core::{PhoneIdentity, TemplateRecord, WachatError};

use crate::client::FastwapiClient;

/// Environment variable consulted when `backend.api_key` is unset.
pub const API_KEY_ENV: &str = "FASTWAPI_API_KEY";

/// FastWAPI backend implementing [`VendorBackend`].
///
/// API key resolution order: config -> `FASTWAPI_API_KEY` env var -> none.
pub struct FastwapiBackend {
    client: FastwapiClient,
}

impl FastwapiBackend {
    /// Creates a backend from the given configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, WachatError> {
        let api_key = resolve_api_key(config.api_key.as_deref());
        if api_key.is_none() {
            warn!("no FastWAPI API key configured, requests will be unauthenticated");
        }
        let client = FastwapiClient::new(
            &config.base_url,
            api_key.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(base_url = %client.base_url(), "FastWAPI backend initialized");
        Ok(Self { client })
    }

    /// Wraps an already-built client.
    pub fn from_client(client: FastwapiClient) -> Self {
        Self { client }
    }
}

fn resolve_api_key(configured: Option<&str>) -> Option<String> {
    configured
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| {
            std::env::var(API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty())
        })
}

#[async_trait]
impl PluginAdapter for FastwapiBackend {
    fn name(&self) -> &str {
        "fastwapi"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, WachatError> {
        match self.client.templates().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), WachatError> {
        Ok(())
    }
}

#[async_trait]
impl VendorBackend for FastwapiBackend {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, WachatError> {
        let conversations: Vec<ConversationSummary> = self
            .client
            .conversations()
            .await?
            .into_iter()
            .map(ConversationSummary::from)
            .collect();
        debug!(count = conversations.len(), "conversations listed");
        Ok(conversations)
    }

    async fn list_messages(
        &self,
        identity: &PhoneIdentity,
    ) -> Result<Vec<BackendMessage>, WachatError> {
        let messages = self.client.messages(identity.digits()).await?;
        Ok(messages.into_iter().map(BackendMessage::from).collect())
    }

    async fn list_templates(&self) -> Result<Vec<TemplateRecord>, WachatError> {
        let templates = self.client.templates().await?;
        Ok(templates.into_iter().map(TemplateRecord::from).collect())
    }
}
