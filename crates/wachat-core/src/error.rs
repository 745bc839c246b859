// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the wachat inbox engine.

use thiserror::Error;

/// The primary error type used across adapter traits and core operations.
#[derive(Debug, Error)]
pub enum WachatError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Key-value store failures (database unavailable, write rejected, quota exceeded).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A persisted value could not be encoded or decoded.
    #[error("serialization error for key `{key}`: {source}")]
    Serialization {
        key: String,
        source: serde_json::Error,
    },

    /// Vendor backend errors (HTTP failure, unexpected status, malformed body).
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A phone identity with no digits reached a store writer.
    #[error("`{raw}` does not contain a phone number")]
    InvalidIdentity { raw: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WachatError {
    /// Shorthand for a backend error without an underlying source.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for failures of the persisted key-value store.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Serialization { .. })
    }
}
