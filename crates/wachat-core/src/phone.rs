// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical phone identity used as the join key for chats and messages.
//!
//! Every raw phone representation (`+92 300 1234567`, `0092-300-1234567`,
//! `923001234567`) is reduced to its ASCII digits and prefixed with `+`.
//! No country or length validation happens here; callers that need a usable
//! number check [`PhoneIdentity::has_digits`] or their own digit-count rules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized `+<digits>` phone identity.
///
/// The only way to build one is [`PhoneIdentity::normalize`], so two values
/// compare equal exactly when their digit sequences are equal. Deserializing
/// runs the same normalization, which lets legacy persisted values with
/// formatting characters load into the canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PhoneIdentity(String);

impl PhoneIdentity {
    /// Strips every non-digit character and prepends `+`.
    ///
    /// Empty or digit-free input yields `+` alone.
    pub fn normalize(raw: &str) -> Self {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        Self(format!("+{digits}"))
    }

    /// The canonical string form, including the leading `+`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digit sequence without the leading `+`.
    pub fn digits(&self) -> &str {
        &self.0[1..]
    }

    /// Number of digits in the identity.
    pub fn digit_count(&self) -> usize {
        self.0.len() - 1
    }

    /// Returns false for the degenerate `+` identity produced by digit-free input.
    pub fn has_digits(&self) -> bool {
        self.digit_count() > 0
    }
}

impl From<String> for PhoneIdentity {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

impl From<&str> for PhoneIdentity {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

impl From<PhoneIdentity> for String {
    fn from(identity: PhoneIdentity) -> Self {
        identity.0
    }
}

impl fmt::Display for PhoneIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Counts the ASCII digits in `raw`.
pub fn digit_count(raw: &str) -> usize {
    raw.chars().filter(|c| c.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formatting_variants_share_one_identity() {
        let expected = "+12345678901";
        assert_eq!(PhoneIdentity::normalize("+1 (234) 567-8901").as_str(), expected);
        assert_eq!(PhoneIdentity::normalize("12345678901").as_str(), expected);
        assert_eq!(PhoneIdentity::normalize("1-234-567-8901").as_str(), expected);
        assert_eq!(PhoneIdentity::normalize(" +1.234.567.8901 ").as_str(), expected);
    }

    #[test]
    fn leading_zeros_are_kept_as_digits() {
        assert_eq!(PhoneIdentity::normalize("00923001234567").as_str(), "+00923001234567");
    }

    #[test]
    fn empty_input_yields_bare_plus() {
        let id = PhoneIdentity::normalize("");
        assert_eq!(id.as_str(), "+");
        assert!(!id.has_digits());
        assert_eq!(id.digits(), "");

        let id = PhoneIdentity::normalize("call me");
        assert_eq!(id.as_str(), "+");
    }

    #[test]
    fn non_ascii_digits_are_stripped() {
        // Arabic-Indic digits are not ASCII digits.
        assert_eq!(PhoneIdentity::normalize("٠١٢3").as_str(), "+3");
    }

    #[test]
    fn deserialization_normalizes() {
        let id: PhoneIdentity = serde_json::from_str("\"92 300-1234567\"").unwrap();
        assert_eq!(id.as_str(), "+923001234567");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"+923001234567\"");
    }

    #[test]
    fn digit_helpers() {
        let id = PhoneIdentity::normalize("+44 20 7946 0958");
        assert_eq!(id.digits(), "442079460958");
        assert_eq!(id.digit_count(), 12);
        assert_eq!(digit_count("+44 (20)"), 4);
    }

    fn separator() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["", " ", "-", ".", "(", ")", "+", "  ", " - "])
            .prop_map(str::to_string)
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in ".{0,40}") {
            let once = PhoneIdentity::normalize(&raw);
            let twice = PhoneIdentity::normalize(once.as_str());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn display_formatting_never_changes_identity(
            digits in "[0-9]{1,15}",
            seps in prop::collection::vec(separator(), 16),
        ) {
            let mut formatted = String::new();
            for (i, ch) in digits.chars().enumerate() {
                formatted.push_str(&seps[i]);
                formatted.push(ch);
            }
            formatted.push_str(&seps[15]);
            prop_assert_eq!(
                PhoneIdentity::normalize(&formatted),
                PhoneIdentity::normalize(&digits)
            );
        }
    }
}
