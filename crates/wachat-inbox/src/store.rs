// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat reconciliation store.
//!
//! [`ChatStore`] is the only writer of chat, message, template, and
//! last-sync state. Live ingestion, navigation, and bulk sync all go through
//! it. Every read-merge-write runs under one async mutex that stays held
//! while the affected collection is written to the key-value store, so
//! concurrent callers never observe or persist a torn collection.
//!
//! Chats are kept in display order: chats with no last message first, then
//! by last message time descending. Ties go to the most recently upserted
//! chat, which falls out of moving each upserted chat to the front and then
//! stable-sorting.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use wachat_core::traits::{KeyValueStore, keys};
use wachat_core::types::avatar_initials;
use wachat_core::{
    Chat, ChatUpdate, DeliveryState, Message, PhoneIdentity, TemplateRecord, UnreadChange,
    WachatError,
};

#[derive(Default)]
struct StoreState {
    chats: Vec<Chat>,
    messages: Vec<Message>,
    templates: Vec<TemplateRecord>,
    active: Option<PhoneIdentity>,
    last_sync: Option<DateTime<Utc>>,
}

/// Single owner of persisted chat state.
pub struct ChatStore {
    kv: Arc<dyn KeyValueStore>,
    state: Mutex<StoreState>,
}

impl ChatStore {
    /// An empty store that has not read anything from `kv`.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Read persisted state from `kv`.
    ///
    /// The chat collection is de-duplicated and re-sorted, and avatar
    /// initials are re-derived from display names; if that changed anything,
    /// the cleaned collection is written back.
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> Result<Self, WachatError> {
        let persisted: Vec<Chat> = read_json(kv.as_ref(), keys::CHATS).await?.unwrap_or_default();
        let messages: Vec<Message> =
            read_json(kv.as_ref(), keys::MESSAGES).await?.unwrap_or_default();
        let templates: Vec<TemplateRecord> =
            read_json(kv.as_ref(), keys::TEMPLATES).await?.unwrap_or_default();
        let last_sync: Option<DateTime<Utc>> = read_json(kv.as_ref(), keys::LAST_SYNC).await?;

        let mut chats = deduplicate(persisted.clone());
        chats.iter_mut().for_each(refresh_derived);
        sort_chats(&mut chats);
        let changed = chats != persisted;

        let store = Self {
            kv,
            state: Mutex::new(StoreState {
                chats,
                messages,
                templates,
                active: None,
                last_sync,
            }),
        };

        let state = store.state.lock().await;
        info!(
            chats = state.chats.len(),
            messages = state.messages.len(),
            templates = state.templates.len(),
            "chat store loaded"
        );
        if changed {
            warn!(
                before = persisted.len(),
                after = state.chats.len(),
                "persisted chats were stale, duplicated, or out of order, rewriting"
            );
            store.persist(keys::CHATS, &state.chats).await?;
        }
        drop(state);

        Ok(store)
    }

    /// Merge `update` into the chat with the same normalized identity, or
    /// insert a new chat. Returns the resulting chat.
    ///
    /// Identities without digits are rejected before anything is written.
    pub async fn upsert(&self, update: ChatUpdate) -> Result<Chat, WachatError> {
        usable_identity(&update.identity)?;
        let mut state = self.state.lock().await;
        let chat = apply_update(&mut state, update);
        self.persist(keys::CHATS, &state.chats).await?;
        Ok(chat)
    }

    /// All chats in display order.
    pub async fn get_all(&self) -> Vec<Chat> {
        self.state.lock().await.chats.clone()
    }

    /// The chat for `raw_identity`, if any.
    pub async fn get(&self, raw_identity: &str) -> Option<Chat> {
        let identity = PhoneIdentity::normalize(raw_identity);
        self.state
            .lock()
            .await
            .chats
            .iter()
            .find(|c| c.identity == identity)
            .cloned()
    }

    /// Collapse chats sharing a normalized identity, keeping the first.
    ///
    /// Persists only when something was removed. Returns whether it was.
    pub async fn deduplicate(&self) -> Result<bool, WachatError> {
        let mut state = self.state.lock().await;
        let before = state.chats.len();
        let chats = deduplicate(std::mem::take(&mut state.chats));
        state.chats = chats;
        if state.chats.len() == before {
            return Ok(false);
        }
        debug!(removed = before - state.chats.len(), "duplicate chats removed");
        self.persist(keys::CHATS, &state.chats).await?;
        Ok(true)
    }

    /// Append a message to the log.
    pub async fn append_message(&self, message: Message) -> Result<(), WachatError> {
        let mut state = self.state.lock().await;
        state.messages.push(message);
        self.persist(keys::MESSAGES, &state.messages).await
    }

    /// The whole message log in append order.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    /// Messages exchanged with `raw_identity`, in log order.
    pub async fn messages_for(&self, raw_identity: &str) -> Vec<Message> {
        let identity = PhoneIdentity::normalize(raw_identity);
        self.state
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.counterpart() == Some(&identity))
            .cloned()
            .collect()
    }

    /// Authoritatively replace chats and messages with a bulk sync result.
    ///
    /// Chats are de-duplicated and sorted; messages are stored as given. The
    /// active chat keeps a zero unread count.
    pub async fn replace_all(
        &self,
        chats: Vec<Chat>,
        messages: Vec<Message>,
        synced_at: DateTime<Utc>,
    ) -> Result<(), WachatError> {
        let mut state = self.state.lock().await;
        let mut chats = deduplicate(chats);
        sort_chats(&mut chats);
        if let Some(active) = &state.active {
            if let Some(chat) = chats.iter_mut().find(|c| &c.identity == active) {
                chat.unread_count = 0;
            }
        }
        state.chats = chats;
        state.messages = messages;
        state.last_sync = Some(synced_at);

        self.persist(keys::CHATS, &state.chats).await?;
        self.persist(keys::MESSAGES, &state.messages).await?;
        self.persist(keys::LAST_SYNC, &synced_at).await?;
        info!(
            chats = state.chats.len(),
            messages = state.messages.len(),
            "chat state replaced from sync"
        );
        Ok(())
    }

    /// Timestamp of the last successful bulk sync.
    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.last_sync
    }

    /// Select (or clear) the active chat.
    ///
    /// Selecting a chat resets its unread count. Returns the selected chat
    /// when it exists.
    pub async fn set_active(&self, raw_identity: Option<&str>) -> Result<Option<Chat>, WachatError> {
        let mut state = self.state.lock().await;
        let Some(raw) = raw_identity else {
            state.active = None;
            return Ok(None);
        };

        let identity = PhoneIdentity::normalize(raw);
        state.active = Some(identity.clone());

        let Some(chat) = state.chats.iter_mut().find(|c| c.identity == identity) else {
            return Ok(None);
        };
        let needs_write = chat.unread_count != 0;
        chat.unread_count = 0;
        let chat = chat.clone();
        if needs_write {
            self.persist(keys::CHATS, &state.chats).await?;
        }
        Ok(Some(chat))
    }

    /// Identity of the active chat.
    pub async fn active(&self) -> Option<PhoneIdentity> {
        self.state.lock().await.active.clone()
    }

    /// Navigation path: create the chat if missing, select it, reset unread.
    ///
    /// A provided name replaces the display name only when the chat is new
    /// or still shows its bare identity.
    pub async fn open_chat(
        &self,
        raw_identity: &str,
        name: Option<String>,
    ) -> Result<Chat, WachatError> {
        let identity = usable_identity(raw_identity)?;
        let mut state = self.state.lock().await;
        let name = name.filter(|n| !n.trim().is_empty());

        let existing = state.chats.iter_mut().find(|c| c.identity == identity);
        let chat = match existing {
            Some(chat) => {
                if let Some(name) = name {
                    if chat.display_name == chat.identity.as_str() {
                        chat.set_display_name(name);
                    }
                }
                chat.unread_count = 0;
                chat.clone()
            }
            None => {
                let mut update = ChatUpdate::new(raw_identity).unread(UnreadChange::Reset);
                update.display_name = name;
                apply_update(&mut state, update)
            }
        };
        state.active = Some(identity);
        self.persist(keys::CHATS, &state.chats).await?;
        Ok(chat)
    }

    /// Append an outbound message and refresh its chat preview.
    ///
    /// The unread count is left alone.
    pub async fn record_outbound(&self, message: Message) -> Result<Chat, WachatError> {
        let Some(identity) = message.counterpart().cloned() else {
            return Err(WachatError::Internal(
                "outbound message has no contact recipient".to_string(),
            ));
        };
        usable_identity(identity.as_str())?;
        let update = ChatUpdate::new(identity.as_str())
            .last_message(message.text.clone(), message.timestamp)
            .unread(UnreadChange::Preserve);
        self.append_message(message).await?;
        self.upsert(update).await
    }

    /// Move a message to `next` if the transition is allowed.
    ///
    /// Returns `false` for unknown ids and rejected transitions.
    pub async fn update_delivery_state(
        &self,
        message_id: &str,
        next: DeliveryState,
    ) -> Result<bool, WachatError> {
        let mut state = self.state.lock().await;
        let Some(message) = state.messages.iter_mut().find(|m| m.id == message_id) else {
            debug!(message_id, "delivery update for unknown message");
            return Ok(false);
        };
        if !message.delivery_state.can_transition_to(next) {
            debug!(
                message_id,
                from = %message.delivery_state,
                to = %next,
                "delivery transition rejected"
            );
            return Ok(false);
        }
        message.delivery_state = next;
        self.persist(keys::MESSAGES, &state.messages).await?;
        Ok(true)
    }

    /// Replace the stored templates.
    pub async fn replace_templates(&self, templates: Vec<TemplateRecord>) -> Result<(), WachatError> {
        let mut state = self.state.lock().await;
        state.templates = templates;
        self.persist(keys::TEMPLATES, &state.templates).await
    }

    /// Stored templates.
    pub async fn templates(&self) -> Vec<TemplateRecord> {
        self.state.lock().await.templates.clone()
    }

    async fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), WachatError> {
        let json = serde_json::to_string(value).map_err(|source| WachatError::Serialization {
            key: key.to_string(),
            source,
        })?;
        if let Err(e) = self.kv.set(key, &json).await {
            warn!(key, error = %e, "failed to persist chat state");
            return Err(e);
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, WachatError> {
    let Some(raw) = kv.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| WachatError::Serialization {
            key: key.to_string(),
            source,
        })
}

fn usable_identity(raw: &str) -> Result<PhoneIdentity, WachatError> {
    let identity = PhoneIdentity::normalize(raw);
    if identity.has_digits() {
        Ok(identity)
    } else {
        Err(WachatError::InvalidIdentity {
            raw: raw.to_string(),
        })
    }
}

/// Bring fields derived from the display name back in line after a load.
fn refresh_derived(chat: &mut Chat) {
    if chat.display_name.trim().is_empty() {
        chat.display_name = chat.identity.to_string();
    }
    chat.avatar_initials = avatar_initials(&chat.display_name);
}

/// Keep the first chat per normalized identity, preserving input order.
pub fn deduplicate(chats: Vec<Chat>) -> Vec<Chat> {
    let mut seen = HashSet::new();
    chats
        .into_iter()
        .filter(|chat| seen.insert(chat.identity.clone()))
        .collect()
}

/// Stable sort into display order.
pub fn sort_chats(chats: &mut [Chat]) {
    chats.sort_by(|a, b| match (a.last_message_time, b.last_message_time) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x),
    });
}

fn apply_update(state: &mut StoreState, update: ChatUpdate) -> Chat {
    let identity = PhoneIdentity::normalize(&update.identity);
    let is_active = state.active.as_ref() == Some(&identity);
    let unread = match update.unread {
        UnreadChange::Increment if is_active => UnreadChange::Preserve,
        other => other,
    };

    let chat = match state.chats.iter().position(|c| c.identity == identity) {
        Some(index) => {
            let mut chat = state.chats.remove(index);
            if let Some(name) = update.display_name.filter(|n| !n.trim().is_empty()) {
                chat.set_display_name(name);
            }
            if let Some(preview) = update.last_message_preview {
                chat.last_message_preview = Some(preview);
            }
            if let Some(time) = update.last_message_time {
                chat.last_message_time = Some(time);
            }
            if let Some(presence) = update.presence {
                chat.presence = presence;
            }
            chat.unread_count = match unread {
                UnreadChange::Preserve => chat.unread_count,
                UnreadChange::Increment => chat.unread_count.saturating_add(1),
                UnreadChange::Reset => 0,
                UnreadChange::Set(n) => n,
            };
            chat
        }
        None => {
            let mut chat = Chat::new(identity, update.display_name);
            chat.last_message_preview = update.last_message_preview;
            chat.last_message_time = update.last_message_time;
            chat.presence = update.presence.unwrap_or(false);
            chat.unread_count = match unread {
                UnreadChange::Preserve | UnreadChange::Reset => 0,
                UnreadChange::Increment => 1,
                UnreadChange::Set(n) => n,
            };
            debug!(identity = %chat.identity, "chat created");
            chat
        }
    };

    state.chats.insert(0, chat.clone());
    sort_chats(&mut state.chats);
    chat
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wachat_core::{Direction, Party};
    use wachat_test_utils::{FailingKvStore, MemoryKvStore};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn chat(raw: &str, time: Option<i64>) -> Chat {
        let mut c = Chat::new(PhoneIdentity::normalize(raw), None);
        c.last_message_time = time.map(at);
        c
    }

    fn identities(chats: &[Chat]) -> Vec<&str> {
        chats.iter().map(|c| c.identity.as_str()).collect()
    }

    fn memory_store() -> (ChatStore, MemoryKvStore) {
        let kv = MemoryKvStore::new();
        (ChatStore::new(Arc::new(kv.clone())), kv)
    }

    #[test]
    fn deduplicate_keeps_first_seen() {
        let mut first = chat("+1 234", None);
        first.display_name = "First".into();
        let mut dup = chat("1234", None);
        dup.display_name = "Second".into();
        let other = chat("999", None);

        let out = deduplicate(vec![first, other, dup]);
        assert_eq!(identities(&out), vec!["+1234", "+999"]);
        assert_eq!(out[0].display_name, "First");
        assert_eq!(deduplicate(out.clone()), out);
    }

    #[test]
    fn sort_puts_untimed_first_then_newest() {
        let mut chats = vec![chat("1", Some(10)), chat("2", None), chat("3", Some(30))];
        sort_chats(&mut chats);
        assert_eq!(identities(&chats), vec!["+2", "+3", "+1"]);
    }

    #[tokio::test]
    async fn upsert_merges_by_normalized_identity() {
        let (store, _kv) = memory_store();
        store
            .upsert(ChatUpdate::new("+12345").unread(UnreadChange::Set(0)))
            .await
            .unwrap();

        let merged = store
            .upsert(ChatUpdate::new("12345").last_message("hi", at(5)).presence(true))
            .await
            .unwrap();

        assert_eq!(merged.identity.as_str(), "+12345");
        assert_eq!(merged.last_message_preview.as_deref(), Some("hi"));
        assert!(merged.presence);
        assert_eq!(merged.unread_count, 0);
        assert_eq!(store.get_all().await.len(), 1);
    }

    #[tokio::test]
    async fn increment_and_reset_unread() {
        let (store, _kv) = memory_store();
        let c = store
            .upsert(ChatUpdate::new("555").unread(UnreadChange::Increment))
            .await
            .unwrap();
        assert_eq!(c.unread_count, 1);
        let c = store
            .upsert(ChatUpdate::new("555").unread(UnreadChange::Increment))
            .await
            .unwrap();
        assert_eq!(c.unread_count, 2);
        let c = store
            .upsert(ChatUpdate::new("555").unread(UnreadChange::Reset))
            .await
            .unwrap();
        assert_eq!(c.unread_count, 0);
        let c = store
            .upsert(ChatUpdate::new("555").unread(UnreadChange::Set(7)))
            .await
            .unwrap();
        assert_eq!(c.unread_count, 7);
    }

    #[tokio::test]
    async fn active_chat_does_not_accumulate_unread() {
        let (store, _kv) = memory_store();
        store
            .upsert(ChatUpdate::new("555").unread(UnreadChange::Set(3)))
            .await
            .unwrap();
        let selected = store.set_active(Some("+555")).await.unwrap().unwrap();
        assert_eq!(selected.unread_count, 0);

        let c = store
            .upsert(ChatUpdate::new("555").unread(UnreadChange::Increment))
            .await
            .unwrap();
        assert_eq!(c.unread_count, 0);

        store.set_active(None).await.unwrap();
        let c = store
            .upsert(ChatUpdate::new("555").unread(UnreadChange::Increment))
            .await
            .unwrap();
        assert_eq!(c.unread_count, 1);
    }

    #[tokio::test]
    async fn ties_go_to_most_recently_upserted() {
        let (store, _kv) = memory_store();
        store.upsert(ChatUpdate::new("1")).await.unwrap();
        store.upsert(ChatUpdate::new("2")).await.unwrap();
        store
            .upsert(ChatUpdate::new("3").last_message("x", at(100)))
            .await
            .unwrap();
        store
            .upsert(ChatUpdate::new("4").last_message("y", at(100)))
            .await
            .unwrap();
        store.upsert(ChatUpdate::new("1")).await.unwrap();

        let all = store.get_all().await;
        assert_eq!(identities(&all), vec!["+1", "+2", "+4", "+3"]);
    }

    #[tokio::test]
    async fn upsert_persists_chats() {
        let (store, kv) = memory_store();
        store
            .upsert(ChatUpdate::new("12345").display_name("Bo"))
            .await
            .unwrap();
        let persisted = kv.json(keys::CHATS).await.unwrap();
        assert_eq!(persisted[0]["identity"], "+12345");
        assert_eq!(persisted[0]["displayName"], "Bo");
        assert_eq!(persisted[0]["avatarInitials"], "B");
    }

    #[tokio::test]
    async fn blank_display_name_is_ignored_on_merge() {
        let (store, _kv) = memory_store();
        store
            .upsert(ChatUpdate::new("12345").display_name("Bo"))
            .await
            .unwrap();
        let c = store
            .upsert(ChatUpdate::new("12345").display_name("  "))
            .await
            .unwrap();
        assert_eq!(c.display_name, "Bo");
    }

    #[tokio::test]
    async fn persistence_failure_surfaces_but_memory_is_updated() {
        let kv = FailingKvStore::failing();
        let store = ChatStore::new(Arc::new(kv.clone()));

        let err = store.upsert(ChatUpdate::new("12345")).await.unwrap_err();
        assert!(err.is_storage());
        assert_eq!(store.get_all().await.len(), 1);
        assert!(kv.inner().raw(keys::CHATS).await.is_none());

        kv.set_failing(false);
        store.upsert(ChatUpdate::new("999")).await.unwrap();
        let persisted = kv.inner().json(keys::CHATS).await.unwrap();
        assert_eq!(persisted.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn load_deduplicates_and_rewrites() {
        let raw = serde_json::json!([
            {"identity": "+1 234", "displayName": "First"},
            {"identity": "1234", "displayName": "Second"},
        ])
        .to_string();
        let kv = MemoryKvStore::with_entries([(keys::CHATS, raw)]);
        let store = ChatStore::load(Arc::new(kv.clone())).await.unwrap();

        let all = store.get_all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].display_name, "First");
        assert_eq!(kv.write_count(), 1);
        assert_eq!(kv.json(keys::CHATS).await.unwrap().as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn load_of_clean_state_does_not_write() {
        let kv = MemoryKvStore::new();
        let store = ChatStore::new(Arc::new(kv.clone()));
        store.upsert(ChatUpdate::new("1")).await.unwrap();
        let writes = kv.write_count();

        let reloaded = ChatStore::load(Arc::new(kv.clone())).await.unwrap();
        assert_eq!(reloaded.get_all().await.len(), 1);
        assert_eq!(kv.write_count(), writes);
    }

    #[tokio::test]
    async fn load_rejects_corrupt_json() {
        let kv = MemoryKvStore::with_entries([(keys::CHATS, "{not json")]);
        let err = ChatStore::load(Arc::new(kv)).await.err().unwrap();
        assert!(matches!(err, WachatError::Serialization { ref key, .. } if key == keys::CHATS));
    }

    #[tokio::test]
    async fn open_chat_creates_selects_and_resets() {
        let (store, _kv) = memory_store();
        let c = store.open_chat("+44 7700 900123", Some("Sara".into())).await.unwrap();
        assert_eq!(c.identity.as_str(), "+447700900123");
        assert_eq!(c.display_name, "Sara");
        assert_eq!(store.active().await, Some(c.identity.clone()));

        store.set_active(None).await.unwrap();
        store
            .upsert(ChatUpdate::new("447700900123").unread(UnreadChange::Increment))
            .await
            .unwrap();
        let c = store.open_chat("447700900123", Some("Other".into())).await.unwrap();
        assert_eq!(c.unread_count, 0);
        assert_eq!(c.display_name, "Sara");
        assert_eq!(store.get_all().await.len(), 1);
    }

    #[tokio::test]
    async fn digitless_identities_never_reach_the_store() {
        let (store, kv) = memory_store();

        for (raw, name) in [("abc", None), ("", Some("Nobody".to_string()))] {
            let err = store.open_chat(raw, name).await.unwrap_err();
            assert!(matches!(err, WachatError::InvalidIdentity { .. }), "got: {err}");
        }
        let err = store
            .upsert(ChatUpdate::new("+ ( ) -").unread(UnreadChange::Increment))
            .await
            .unwrap_err();
        assert!(matches!(err, WachatError::InvalidIdentity { ref raw } if raw == "+ ( ) -"));

        let outbound = Message::outbound(PhoneIdentity::normalize("none"), "hi", None);
        assert!(store.record_outbound(outbound).await.is_err());

        assert!(store.get_all().await.is_empty());
        assert!(store.messages().await.is_empty());
        assert_eq!(store.active().await, None);
        assert_eq!(kv.write_count(), 0);
    }

    #[tokio::test]
    async fn load_rederives_avatar_initials() {
        let raw = serde_json::json!([
            {"identity": "12345", "displayName": "Sara Ahmed"},
            {"identity": "999", "displayName": "  ", "avatarInitials": "ZZ"},
        ])
        .to_string();
        let kv = MemoryKvStore::with_entries([(keys::CHATS, raw)]);
        let store = ChatStore::load(Arc::new(kv.clone())).await.unwrap();

        let sara = store.get("12345").await.unwrap();
        assert_eq!(sara.avatar_initials, "SA");
        let bare = store.get("999").await.unwrap();
        assert_eq!(bare.display_name, "+999");
        assert_eq!(bare.avatar_initials, "9");
        assert_eq!(kv.json(keys::CHATS).await.unwrap()[0]["avatarInitials"], "SA");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_upserts_collapse_to_one_chat() {
        let kv = MemoryKvStore::new();
        let store = Arc::new(ChatStore::new(Arc::new(kv.clone())));

        let spellings = ["+92 300 1234567", "923001234567", "(92) 300-123-4567"];
        let tasks: Vec<_> = (0..30)
            .map(|i| {
                let store = Arc::clone(&store);
                let raw = spellings[i % spellings.len()];
                tokio::spawn(async move {
                    store
                        .upsert(ChatUpdate::new(raw).unread(UnreadChange::Increment))
                        .await
                })
            })
            .collect();
        let (a, b) = tokio::join!(
            store.upsert(ChatUpdate::new("923001234567").last_message("x", at(10))),
            store.upsert(ChatUpdate::new("+1 555 0100").display_name("Other")),
        );
        a.unwrap();
        b.unwrap();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let all = store.get_all().await;
        assert_eq!(identities(&all), vec!["+15550100", "+923001234567"]);
        assert_eq!(all[1].unread_count, 30);

        let persisted = kv.json(keys::CHATS).await.unwrap();
        assert_eq!(persisted.as_array().unwrap().len(), 2);
        assert_eq!(persisted[1]["unreadCount"], 30);
    }

    #[tokio::test]
    async fn open_chat_names_a_chat_showing_its_identity() {
        let (store, _kv) = memory_store();
        store.upsert(ChatUpdate::new("12345")).await.unwrap();
        let c = store.open_chat("12345", Some("Named".into())).await.unwrap();
        assert_eq!(c.display_name, "Named");
    }

    #[tokio::test]
    async fn outbound_updates_preview_without_unread() {
        let (store, _kv) = memory_store();
        store
            .upsert(ChatUpdate::new("12345").unread(UnreadChange::Set(2)))
            .await
            .unwrap();
        let msg = Message::outbound(PhoneIdentity::normalize("12345"), "on my way", None);
        let id = msg.id.clone();
        let c = store.record_outbound(msg).await.unwrap();
        assert_eq!(c.last_message_preview.as_deref(), Some("on my way"));
        assert_eq!(c.unread_count, 2);

        let log = store.messages_for("+1 2345").await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].direction, Direction::Sent);
        assert_eq!(log[0].from, Party::Business);

        assert!(store.update_delivery_state(&id, DeliveryState::Sent).await.unwrap());
        assert!(store.update_delivery_state(&id, DeliveryState::Delivered).await.unwrap());
        assert!(!store.update_delivery_state(&id, DeliveryState::Failed).await.unwrap());
        assert!(!store.update_delivery_state("nope", DeliveryState::Sent).await.unwrap());
        assert_eq!(store.messages().await[0].delivery_state, DeliveryState::Delivered);
    }

    #[tokio::test]
    async fn replace_all_overwrites_and_records_sync_time() {
        let (store, kv) = memory_store();
        store.upsert(ChatUpdate::new("1")).await.unwrap();

        store
            .replace_all(
                vec![chat("2", Some(5)), chat("3", None), chat("+2", None)],
                Vec::new(),
                at(1_000),
            )
            .await
            .unwrap();

        assert_eq!(identities(&store.get_all().await), vec!["+3", "+2"]);
        assert_eq!(store.last_sync().await, Some(at(1_000)));
        assert_eq!(
            kv.json(keys::LAST_SYNC).await.unwrap(),
            serde_json::json!("1970-01-01T00:16:40Z")
        );
        assert_eq!(kv.json(keys::MESSAGES).await.unwrap(), serde_json::json!([]));
    }

    #[tokio::test]
    async fn deduplicate_persists_only_on_change() {
        let kv = MemoryKvStore::new();
        let store = ChatStore::new(Arc::new(kv.clone()));
        assert!(!store.deduplicate().await.unwrap());
        assert_eq!(kv.write_count(), 0);
    }

    #[tokio::test]
    async fn templates_round_trip() {
        let (store, kv) = memory_store();
        store
            .replace_templates(vec![TemplateRecord::new("hello", "Hi {{1}}")])
            .await
            .unwrap();
        assert_eq!(store.templates().await[0].variables, vec!["1"]);
        assert_eq!(kv.json(keys::TEMPLATES).await.unwrap()[0]["name"], "hello");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_chats() -> impl Strategy<Value = Vec<Chat>> {
            prop::collection::vec(("[0-9]{1,3}", prop::option::of(0i64..50)), 0..24).prop_map(
                |entries| {
                    entries
                        .into_iter()
                        .map(|(digits, time)| chat(&digits, time))
                        .collect()
                },
            )
        }

        proptest! {
            #[test]
            fn deduplicate_leaves_unique_identities(chats in arb_chats()) {
                let out = deduplicate(chats.clone());
                let unique: HashSet<_> = chats.iter().map(|c| c.identity.clone()).collect();
                prop_assert_eq!(out.len(), unique.len());
                prop_assert_eq!(deduplicate(out.clone()), out);
            }

            #[test]
            fn sorted_chats_follow_display_order(chats in arb_chats()) {
                let mut sorted = chats;
                sort_chats(&mut sorted);
                for pair in sorted.windows(2) {
                    match (pair[0].last_message_time, pair[1].last_message_time) {
                        (Some(_), None) => prop_assert!(false, "untimed chat after timed one"),
                        (Some(a), Some(b)) => prop_assert!(a >= b),
                        _ => {}
                    }
                }
            }
        }
    }
}
