// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the persistence and vendor backend seams.
//!
//! Both adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod backend;
pub mod storage;

pub use adapter::PluginAdapter;
pub use backend::VendorBackend;
pub use storage::{KeyValueStore, keys};
