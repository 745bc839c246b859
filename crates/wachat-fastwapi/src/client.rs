// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the FastWAPI REST API.
//!
//! Provides [`FastwapiClient`], which handles bearer authentication, the
//! per-request timeout, list envelope decoding, and a single retry on
//! transient status codes.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use wachat_core::WachatError;

use crate::types::{ApiConversation, ApiErrorResponse, ApiMessage, ApiTemplate, ListBody};

/// HTTP client for FastWAPI communication.
#[derive(Debug, Clone)]
pub struct FastwapiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl FastwapiClient {
    /// Creates a client for `base_url` (with or without a trailing slash).
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, WachatError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                WachatError::Config(format!("invalid API key header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| WachatError::Backend {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Overrides the pause before a retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /conversations`
    pub async fn conversations(&self) -> Result<Vec<ApiConversation>, WachatError> {
        self.get_list("/conversations").await
    }

    /// `GET /conversations/{digits}/messages`
    pub async fn messages(&self, digits: &str) -> Result<Vec<ApiMessage>, WachatError> {
        self.get_list(&format!("/conversations/{digits}/messages"))
            .await
    }

    /// `GET /templates`
    pub async fn templates(&self) -> Result<Vec<ApiTemplate>, WachatError> {
        self.get_list("/templates").await
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, WachatError> {
        let body: ListBody<T> = self.get_json(path).await?;
        Ok(body.into_items())
    }

    /// GET `path` and decode the JSON body.
    ///
    /// On transient errors (429, 500, 502, 503), retries once after
    /// `retry_delay`.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, WachatError> {
        let url = format!("{}{path}", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, url = %url, "retrying request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| self.request_error(e))?;

            let status = response.status();
            debug!(status = %status, attempt, url = %url, "response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| self.request_error(e))?;
                return serde_json::from_str(&body).map_err(|e| WachatError::Backend {
                    message: format!("failed to parse response from {path}: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("FastWAPI error ({status}): {}", api_err.message),
                Err(_) => format!("FastWAPI returned {status}: {body}"),
            };

            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(WachatError::backend(message));
                continue;
            }

            return Err(WachatError::backend(message));
        }

        Err(last_error
            .unwrap_or_else(|| WachatError::backend(format!("request to {path} failed after retries"))))
    }

    fn request_error(&self, e: reqwest::Error) -> WachatError {
        if e.is_timeout() {
            return WachatError::Timeout {
                duration: self.timeout,
            };
        }
        WachatError::Backend {
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}
