// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for wachat integration tests.
//!
//! Provides in-memory adapters for fast, deterministic tests without a
//! database file or a live vendor backend.
//!
//! # Components
//!
//! - [`MemoryKvStore`] - In-memory key-value store with write counting
//! - [`FailingKvStore`] - Key-value store whose writes can be switched to fail
//! - [`MockBackend`] - Vendor backend with scripted conversations and failures

pub mod mock_backend;
pub mod mock_store;

pub use mock_backend::MockBackend;
pub use mock_store::{FailingKvStore, MemoryKvStore};
