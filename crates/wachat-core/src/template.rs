// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message templates with positional `{{n}}` placeholders.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\d+)\s*\}\}").expect("valid regex"));

/// A pre-approved message template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub variables: Vec<String>,
}

impl TemplateRecord {
    /// Builds a template and derives its variable list from the content.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let variables = extract_variables(&content);
        Self {
            name: name.into(),
            content,
            variables,
        }
    }

    /// Substitutes `{{n}}` with `values[n - 1]`.
    ///
    /// Placeholders without a matching value are left untouched.
    pub fn render(&self, values: &[&str]) -> String {
        PLACEHOLDER
            .replace_all(&self.content, |caps: &regex::Captures<'_>| {
                let whole = caps[0].to_string();
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| values.get(i))
                    .map(|v| (*v).to_string())
                    .unwrap_or(whole)
            })
            .into_owned()
    }
}

/// Returns the distinct placeholder numbers in order of first appearance.
pub fn extract_variables(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in PLACEHOLDER.captures_iter(content) {
        let n = caps[1].to_string();
        if !seen.contains(&n) {
            seen.push(n);
        }
    }
    seen
}
