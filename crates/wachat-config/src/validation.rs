// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Range and format checks that serde alone cannot express.

use crate::diagnostic::ConfigError;
use crate::model::WachatConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Check a deserialized configuration for values serde accepted but wachat cannot use.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &WachatConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.app.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "app.log_level `{}` must be one of {}",
                config.app.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let base_url = config.backend.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!("backend.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    if config.backend.timeout_secs < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "backend.timeout_secs must be at least 1, got {}",
                config.backend.timeout_secs
            ),
        });
    }

    if let Some(key) = &config.backend.api_key {
        if key.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "backend.api_key must not be blank when set".to_string(),
            });
        }
    }

    if config.ingest.queue_capacity < 1 {
        errors.push(ConfigError::Validation {
            message: "ingest.queue_capacity must be at least 1, got 0".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
