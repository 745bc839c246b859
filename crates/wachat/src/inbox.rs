// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wachat chats`, `wachat messages`, and `wachat open`.

use std::sync::Arc;

use wachat_config::WachatConfig;
use wachat_core::traits::{KeyValueStore, PluginAdapter};
use wachat_core::{Chat, Direction, Message, WachatError};
use wachat_inbox::ChatStore;
use wachat_storage::SqliteKvStore;

/// An opened store plus the KV handle that must be shut down on exit.
pub struct OpenedStore {
    pub store: Arc<ChatStore>,
    kv: Arc<SqliteKvStore>,
}

impl OpenedStore {
    /// Checkpoint and release the database.
    pub async fn close(self) -> Result<(), WachatError> {
        drop(self.store);
        self.kv.shutdown().await
    }
}

/// Open the SQLite store and load persisted chat state.
pub async fn open_store(config: &WachatConfig) -> Result<OpenedStore, WachatError> {
    let kv = Arc::new(SqliteKvStore::open(&config.storage).await?);
    let dyn_kv: Arc<dyn KeyValueStore> = kv.clone();
    let store = Arc::new(ChatStore::load(dyn_kv).await?);
    Ok(OpenedStore { store, kv })
}

/// Print all chats in display order.
pub async fn run_chats(config: &WachatConfig, json: bool) -> Result<(), WachatError> {
    let opened = open_store(config).await?;
    let chats = opened.store.get_all().await;
    if json {
        println!("{}", to_json(&chats)?);
    } else if chats.is_empty() {
        println!("no chats");
    } else {
        for chat in &chats {
            println!("{}", format_chat(chat));
        }
    }
    opened.close().await
}

/// Print the messages exchanged with `phone`.
pub async fn run_messages(config: &WachatConfig, phone: &str, json: bool) -> Result<(), WachatError> {
    let opened = open_store(config).await?;
    let messages = opened.store.messages_for(phone).await;
    if json {
        println!("{}", to_json(&messages)?);
    } else {
        for message in &messages {
            println!("{}", format_message(message));
        }
    }
    opened.close().await
}

/// Create or select the chat for `phone` and print it.
pub async fn run_open(
    config: &WachatConfig,
    phone: &str,
    name: Option<String>,
) -> Result<(), WachatError> {
    let opened = open_store(config).await?;
    let opened_chat = opened.store.open_chat(phone, name).await;
    opened.close().await?;
    println!("{}", format_chat(&opened_chat?));
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, WachatError> {
    serde_json::to_string_pretty(value).map_err(|source| WachatError::Serialization {
        key: "output".to_string(),
        source,
    })
}

pub fn format_chat(chat: &Chat) -> String {
    let unread = if chat.unread_count > 0 {
        format!(" ({} unread)", chat.unread_count)
    } else {
        String::new()
    };
    let when = chat
        .last_message_time
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<16} {:<24} {:<16} {}{unread}",
        chat.identity.as_str(),
        chat.display_name,
        when,
        chat.last_message_preview.as_deref().unwrap_or(""),
    )
}

pub fn format_message(message: &Message) -> String {
    let arrow = match message.direction {
        Direction::Received => "<-",
        Direction::Sent => "->",
    };
    format!(
        "{} {arrow} [{}] {}",
        message.timestamp.format("%Y-%m-%d %H:%M:%S"),
        message.delivery_state,
        message.text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wachat_core::PhoneIdentity;

    #[test]
    fn chat_line_shows_unread_only_when_nonzero() {
        let mut chat = Chat::new(PhoneIdentity::normalize("923001234567"), Some("Ali".into()));
        chat.last_message_preview = Some("salaam".into());
        let line = format_chat(&chat);
        assert!(line.starts_with("+923001234567"));
        assert!(line.contains("Ali"));
        assert!(line.ends_with("salaam"));

        chat.unread_count = 2;
        assert!(format_chat(&chat).ends_with("salaam (2 unread)"));
    }

    #[test]
    fn message_line_shows_direction() {
        let msg = Message::outbound(PhoneIdentity::normalize("111111111"), "hello", None);
        let line = format_message(&msg);
        assert!(line.contains("-> [sending] hello"), "got: {line}");
    }
}
