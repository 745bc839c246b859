// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the wachat inbox engine.
//!
//! A WAL-mode SQLite file with embedded migrations holds one `kv_entries`
//! table. All access is serialized through a single `tokio-rusqlite`
//! connection.

pub mod adapter;
pub mod database;
pub mod migrations;

pub use adapter::SqliteKvStore;
pub use database::Database;
