// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the wachat inbox engine.
//!
//! This crate provides the phone identity normalizer, the chat and message
//! data model, error types, and the adapter traits (key-value persistence
//! and vendor backend) that the rest of the workspace builds on.

pub mod error;
pub mod phone;
pub mod template;
pub mod timestamp;
pub mod traits;
pub mod types;

pub use error::WachatError;
pub use phone::PhoneIdentity;
pub use template::TemplateRecord;
pub use types::{
    AdapterType, BackendMessage, Chat, ChatUpdate, ConversationSummary, DeliveryState, Direction,
    HealthStatus, Message, Party, UnreadChange,
};

pub use traits::{KeyValueStore, PluginAdapter, VendorBackend};
