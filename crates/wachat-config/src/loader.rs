// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered loading of `wachat.toml` through figment.

#![allow(clippy::result_large_err)] // figment::Error is large

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WachatConfig;

/// Top-level sections, used to split env var names into `section.key`.
const SECTIONS: &[&str] = &["app", "storage", "backend", "sync", "ingest"];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/wachat/wachat.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "wachat.toml";

/// `~/.config/wachat/wachat.toml`, when a config dir exists.
pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wachat/wachat.toml"))
}

/// Defaults, the XDG and local config files, then `WACHAT_*` variables.
///
/// Later layers win:
/// 1. Compiled defaults
/// 2. `/etc/wachat/wachat.toml` (system-wide)
/// 3. `~/.config/wachat/wachat.toml` (user XDG config)
/// 4. `./wachat.toml` (local directory)
/// 5. `WACHAT_*` environment variables
pub fn load_config() -> Result<WachatConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<WachatConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WachatConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Defaults, then the file at `path`, then `WACHAT_*` variables.
pub fn load_config_from_path(path: &Path) -> Result<WachatConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WachatConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WachatConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider that maps `WACHAT_BACKEND_API_KEY` to `backend.api_key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// key names containing underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("WACHAT_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    let lowered = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = lowered
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    lowered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("backend_api_key"), "backend.api_key");
        assert_eq!(map_env_key("SYNC_REQUEST_DELAY_MS"), "sync.request_delay_ms");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("ingest_queue_capacity"), "ingest.queue_capacity");
        assert_eq!(map_env_key("app_log_level"), "app.log_level");
    }

    #[test]
    fn unknown_section_passes_through() {
        assert_eq!(map_env_key("telemetry_level"), "telemetry_level");
        assert_eq!(map_env_key("application"), "application");
    }
}
