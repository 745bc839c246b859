// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp decoding shared by webhook extraction and the backend client.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Values above this are unix milliseconds rather than seconds.
pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Decode unix seconds, unix milliseconds, or RFC 3339 from a JSON scalar.
///
/// Numeric strings are treated like numbers. Anything else yields `None`.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(from_unix),
        Value::String(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(n) => from_unix(n),
                Err(_) => DateTime::parse_from_rfc3339(trimmed)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc)),
            }
        }
        _ => None,
    }
}

/// Seconds or milliseconds since the epoch, told apart by magnitude.
pub fn from_unix(n: i64) -> Option<DateTime<Utc>> {
    if n > MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(n).single()
    } else {
        Utc.timestamp_opt(n, 0).single()
    }
}
