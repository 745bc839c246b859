// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory key-value stores for deterministic testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use wachat_core::WachatError;
use wachat_core::traits::{KeyValueStore, PluginAdapter};
use wachat_core::types::{AdapterType, HealthStatus};

/// A `HashMap`-backed key-value store.
///
/// Cloning shares the underlying map, so a test can hand one clone to the
/// code under test and inspect the other.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with raw string values.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(Mutex::new(map)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Raw stored value for `key`.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Stored value for `key` parsed as JSON.
    pub async fn json(&self, key: &str) -> Option<serde_json::Value> {
        self.raw(key)
            .await
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MemoryKvStore {
    fn name(&self) -> &str {
        "memory-kv"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, WachatError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WachatError> {
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, WachatError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), WachatError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), WachatError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// A [`MemoryKvStore`] whose writes fail while the failure switch is on.
///
/// Reads always succeed, so a test can verify that nothing reached the
/// backing map during a failed write.
#[derive(Clone, Default)]
pub struct FailingKvStore {
    inner: MemoryKvStore,
    failing: Arc<AtomicBool>,
}

impl FailingKvStore {
    /// Create a store that starts out healthy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose writes fail from the start.
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    /// Toggle write failures.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The backing store, for inspection.
    pub fn inner(&self) -> &MemoryKvStore {
        &self.inner
    }

    fn check(&self) -> Result<(), WachatError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WachatError::Storage {
                source: Box::new(std::io::Error::other("quota exceeded")),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FailingKvStore {
    fn name(&self) -> &str {
        "failing-kv"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, WachatError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Degraded("writes failing".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), WachatError> {
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FailingKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, WachatError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), WachatError> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), WachatError> {
        self.check()?;
        self.inner.remove(key).await
    }
}
