// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the FastWAPI REST API.
//!
//! The API is loosely specified, so field names accept the spellings seen in
//! practice and identifiers may arrive as strings or numbers.

use serde::Deserialize;
use serde_json::Value;

use wachat_core::timestamp::parse_timestamp;
use wachat_core::{BackendMessage, ConversationSummary, TemplateRecord};

/// A list response: either a bare array or `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListBody<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiConversation {
    #[serde(alias = "phone", alias = "wa_id", alias = "number")]
    pub identity: Value,
    #[serde(default, alias = "contact_name")]
    pub name: Option<String>,
    #[serde(default, alias = "lastMessage")]
    pub last_message: Option<String>,
    #[serde(default, alias = "lastMessageTime")]
    pub last_message_time: Option<Value>,
    #[serde(default, alias = "unreadCount")]
    pub unread_count: Option<u32>,
}

impl From<ApiConversation> for ConversationSummary {
    fn from(c: ApiConversation) -> Self {
        Self {
            identity: scalar_string(&c.identity).unwrap_or_default(),
            name: c.name.filter(|n| !n.trim().is_empty()),
            last_message: c.last_message,
            last_message_time: c.last_message_time.as_ref().and_then(parse_timestamp),
            unread_count: c.unread_count.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiMessage {
    #[serde(alias = "body", alias = "message")]
    pub text: String,
    #[serde(default, alias = "fromIsContact", alias = "from_contact")]
    pub from_is_contact: bool,
    #[serde(default, alias = "time", alias = "created_at")]
    pub timestamp: Option<Value>,
    #[serde(default, alias = "message_id")]
    pub id: Option<Value>,
}

impl From<ApiMessage> for BackendMessage {
    fn from(m: ApiMessage) -> Self {
        Self {
            text: m.text,
            from_is_contact: m.from_is_contact,
            timestamp: m.timestamp.as_ref().and_then(parse_timestamp),
            id: m.id.as_ref().and_then(scalar_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiTemplate {
    pub name: String,
    #[serde(alias = "body", alias = "text")]
    pub content: String,
    #[serde(default)]
    pub variables: Vec<String>,
}

impl From<ApiTemplate> for TemplateRecord {
    fn from(t: ApiTemplate) -> Self {
        if t.variables.is_empty() {
            TemplateRecord::new(t.name, t.content)
        } else {
            TemplateRecord {
                name: t.name,
                content: t.content,
                variables: t.variables,
            }
        }
    }
}

/// Error body returned on non-success status codes.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(alias = "error", alias = "detail")]
    pub message: String,
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_body_accepts_both_shapes() {
        let bare: ListBody<ApiTemplate> =
            serde_json::from_value(json!([{"name": "a", "content": "x"}])).unwrap();
        assert_eq!(bare.into_items().len(), 1);

        let wrapped: ListBody<ApiTemplate> =
            serde_json::from_value(json!({"data": [{"name": "a", "body": "x"}]})).unwrap();
        assert_eq!(wrapped.into_items()[0].content, "x");
    }

    #[test]
    fn conversation_accepts_numeric_phone_and_camel_case() {
        let c: ApiConversation = serde_json::from_value(json!({
            "phone": 923001234567u64,
            "name": "Ali",
            "lastMessage": "hi",
            "lastMessageTime": "2025-06-08T20:59:43Z",
            "unreadCount": 2
        }))
        .unwrap();
        let summary = ConversationSummary::from(c);
        assert_eq!(summary.identity, "923001234567");
        assert_eq!(summary.last_message.as_deref(), Some("hi"));
        assert_eq!(summary.last_message_time.unwrap().timestamp(), 1_749_416_383);
        assert_eq!(summary.unread_count, 2);
    }

    #[test]
    fn message_timestamps_in_seconds_or_millis() {
        let secs: ApiMessage =
            serde_json::from_value(json!({"text": "a", "timestamp": 1_700_000_000})).unwrap();
        let millis: ApiMessage =
            serde_json::from_value(json!({"body": "b", "time": 1_700_000_000_000i64})).unwrap();
        assert_eq!(
            BackendMessage::from(secs).timestamp,
            BackendMessage::from(millis).timestamp
        );
    }

    #[test]
    fn message_defaults_to_business_side() {
        let m: ApiMessage = serde_json::from_value(json!({"message": "x", "id": 42})).unwrap();
        let m = BackendMessage::from(m);
        assert!(!m.from_is_contact);
        assert_eq!(m.id.as_deref(), Some("42"));
        assert!(m.timestamp.is_none());
    }

    #[test]
    fn template_without_variables_derives_them() {
        let t: ApiTemplate =
            serde_json::from_value(json!({"name": "t", "text": "Hi {{1}}"})).unwrap();
        assert_eq!(TemplateRecord::from(t).variables, vec!["1"]);
    }
}
