// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic field extraction from unschema'd realtime payloads.
//!
//! Relay payloads arrive in many shapes (Cloud API webhooks, flat direct
//! messages, vendor envelopes). [`extract`] locates the message text, sender
//! phone, sender name, message id, and timestamp using, per field:
//!
//! 1. A pre-order walk that tries fixed priority accessor paths at every
//!    object, visiting keys in insertion order.
//! 2. A bare-scalar walk that accepts any qualifying string.
//! 3. A regex scan over the serialized payload, only when neither text nor
//!    phone was found.
//! 4. Known payload shapes, each filling only fields still missing.
//!
//! Ties resolve to the first path in priority order, then the first key in
//! insertion order. The function is pure.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use wachat_core::phone::digit_count;
use wachat_core::timestamp::parse_timestamp;

const TEXT_PATHS: &[&str] = &[
    "text",
    "body",
    "message",
    "content",
    "msg",
    "text.body",
    "message.body",
    "content.body",
    "msg.body",
];

const PHONE_PATHS: &[&str] = &["from", "phone", "number", "sender", "wa_id", "whatsapp_id"];

const NAME_PATHS: &[&str] = &[
    "name",
    "contact_name",
    "profile_name",
    "display_name",
    "user_name",
    "profile.name",
    "contact.name",
];

const ID_PATHS: &[&str] = &["id", "message_id", "wamid"];

const TIMESTAMP_PATHS: &[&str] = &["timestamp", "time", "created_at", "date"];

const MIN_PHONE_DIGITS: usize = 8;
const MAX_PHONE_DIGITS: usize = 15;
const MAX_NAME_CHARS: usize = 100;
const MIN_FALLBACK_TEXT_CHARS: usize = 4;
const MAX_FALLBACK_TEXT_CHARS: usize = 500;

static BARE_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9][0-9]{7,14}$").expect("valid bare phone regex"));

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?[0-9]+").expect("valid digit run regex"));

static STRING_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("valid string token regex"));

/// Fields located in a raw payload. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub text: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ExtractedFields {
    fn has_text_and_phone(&self) -> bool {
        self.text.is_some() && self.phone.is_some()
    }

    /// Fill every field that is still `None` from `other`.
    fn fill_missing(&mut self, other: ExtractedFields) {
        self.text = self.text.take().or(other.text);
        self.phone = self.phone.take().or(other.phone);
        self.name = self.name.take().or(other.name);
        self.id = self.id.take().or(other.id);
        self.timestamp = self.timestamp.take().or(other.timestamp);
    }
}

/// Locate message fields in `payload`.
pub fn extract(payload: &Value) -> ExtractedFields {
    let text = priority_walk(payload, TEXT_PATHS, &accept_text)
        .or_else(|| bare_walk(payload, &accept_text_str));

    let chosen_text = text.clone();
    let not_text = |s: &str| chosen_text.as_deref() != Some(s.trim());

    let phone = priority_walk(payload, PHONE_PATHS, &accept_phone).or_else(|| {
        bare_walk(payload, &|s| {
            if not_text(s) { accept_bare_phone(s) } else { None }
        })
    });

    let name = priority_walk(payload, NAME_PATHS, &accept_text).or_else(|| {
        bare_walk(payload, &|s| {
            if not_text(s) { accept_bare_name(s) } else { None }
        })
    });

    let mut fields = ExtractedFields {
        text,
        phone,
        name,
        id: priority_walk(payload, ID_PATHS, &accept_text),
        timestamp: priority_walk(payload, TIMESTAMP_PATHS, &parse_timestamp),
    };

    if fields.text.is_none() && fields.phone.is_none() {
        let serialized = payload.to_string();
        fields.phone = scan_phone(&serialized);
        fields.text = scan_text(&serialized);
    }

    let webhook = webhook_shape(payload);
    if let Some(shape) = &webhook {
        // Message-level identifiers beat the business-account ids that
        // precede them in the envelope.
        if shape.id.is_some() {
            fields.id = shape.id.clone();
        }
        if shape.timestamp.is_some() {
            fields.timestamp = shape.timestamp;
        }
    }

    if !fields.has_text_and_phone() {
        let shapes = [webhook, flat_shape(payload), messages_shape(payload)];
        for shape in shapes.into_iter().flatten() {
            fields.fill_missing(shape);
            if fields.has_text_and_phone() {
                break;
            }
        }
    }

    fields
}

/// Resolve a dotted path such as `text.body` against an object node.
fn resolve<'a>(node: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(node, |current, key| current.get(key))
}

/// Pre-order walk trying every priority path at each object before
/// descending into its children.
fn priority_walk<T>(
    node: &Value,
    paths: &[&str],
    accept: &dyn Fn(&Value) -> Option<T>,
) -> Option<T> {
    match node {
        Value::Object(map) => {
            for path in paths {
                if let Some(found) = resolve(node, path).and_then(accept) {
                    return Some(found);
                }
            }
            map.values()
                .find_map(|child| priority_walk(child, paths, accept))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|child| priority_walk(child, paths, accept)),
        _ => None,
    }
}

/// Pre-order walk returning the first string scalar `accept` takes.
fn bare_walk(node: &Value, accept: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    match node {
        Value::String(s) => accept(s),
        Value::Object(map) => map.values().find_map(|child| bare_walk(child, accept)),
        Value::Array(items) => items.iter().find_map(|child| bare_walk(child, accept)),
        _ => None,
    }
}

fn accept_text(value: &Value) -> Option<String> {
    value.as_str().and_then(accept_text_str)
}

fn accept_text_str(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn phone_digits_in_range(raw: &str) -> bool {
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digit_count(raw))
}

fn accept_phone(value: &Value) -> Option<String> {
    let candidate = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if n.is_u64() || n.is_i64() => n.to_string(),
        _ => return None,
    };
    phone_digits_in_range(&candidate).then_some(candidate)
}

fn accept_bare_phone(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (phone_digits_in_range(trimmed) || BARE_PHONE.is_match(trimmed)).then(|| trimmed.to_string())
}

fn accept_bare_name(s: &str) -> Option<String> {
    let trimmed = s.trim();
    let qualifies = !trimmed.is_empty()
        && trimmed.chars().count() < MAX_NAME_CHARS
        && digit_count(trimmed) < MIN_PHONE_DIGITS;
    qualifies.then(|| trimmed.to_string())
}

/// First `+`-optional digit run that starts with 1-9 and has 8-15 digits.
fn scan_phone(serialized: &str) -> Option<String> {
    DIGIT_RUN
        .find_iter(serialized)
        .map(|m| m.as_str())
        .find(|run| {
            let digits = run.trim_start_matches('+');
            !digits.starts_with('0') && phone_digits_in_range(digits)
        })
        .map(str::to_string)
}

/// First JSON string token of 4-500 unescaped characters that is not
/// purely numeric.
fn scan_text(serialized: &str) -> Option<String> {
    STRING_TOKEN
        .find_iter(serialized)
        .filter_map(|m| serde_json::from_str::<String>(m.as_str()).ok())
        .find(|s| {
            let len = s.chars().count();
            (MIN_FALLBACK_TEXT_CHARS..=MAX_FALLBACK_TEXT_CHARS).contains(&len)
                && !s.chars().all(|c| c.is_ascii_digit())
        })
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value.and_then(accept_text)
}

fn loose_phone(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => accept_text_str(s),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

/// Cloud API webhook: `entry[0].changes[0].value` holding `messages[0]`
/// and `contacts[0].profile.name`.
fn webhook_shape(payload: &Value) -> Option<ExtractedFields> {
    let value = payload.pointer("/entry/0/changes/0/value")?;
    let message = value.pointer("/messages/0")?;
    Some(ExtractedFields {
        text: non_empty_str(message.pointer("/text/body"))
            .or_else(|| non_empty_str(message.pointer("/button/text")))
            .or_else(|| non_empty_str(message.pointer("/interactive/button_reply/title"))),
        phone: loose_phone(message.get("from"))
            .or_else(|| loose_phone(value.pointer("/contacts/0/wa_id"))),
        name: non_empty_str(value.pointer("/contacts/0/profile/name")),
        id: non_empty_str(message.get("id")),
        timestamp: message.get("timestamp").and_then(parse_timestamp),
    })
}

/// Flat direct message: top-level sender, body, and name.
fn flat_shape(payload: &Value) -> Option<ExtractedFields> {
    payload.as_object()?;
    let phone = ["from", "phone", "wa_id"]
        .iter()
        .find_map(|k| loose_phone(payload.get(*k)));
    let text = ["text", "body", "message"]
        .iter()
        .find_map(|k| non_empty_str(payload.get(*k)));
    Some(ExtractedFields {
        text,
        phone,
        name: non_empty_str(payload.get("name")),
        ..ExtractedFields::default()
    })
}

/// Generic envelope with a `messages` array at the top level.
fn messages_shape(payload: &Value) -> Option<ExtractedFields> {
    let message = payload.pointer("/messages/0")?;
    Some(ExtractedFields {
        text: non_empty_str(message.get("text"))
            .or_else(|| non_empty_str(message.pointer("/text/body")))
            .or_else(|| non_empty_str(message.get("body"))),
        phone: loose_phone(message.get("from")),
        name: non_empty_str(message.get("name"))
            .or_else(|| non_empty_str(message.get("contact_name"))),
        id: non_empty_str(message.get("id")),
        timestamp: message.get("timestamp").and_then(parse_timestamp),
    })
}
