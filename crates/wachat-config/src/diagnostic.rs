// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment failures into miette diagnostics.
//!
//! Unknown keys get a source span pointing at the offending line when the
//! TOML text is available, plus the closest valid key by Jaro-Winkler
//! similarity.

#![allow(unused_assignments)] // the Diagnostic derive trips this lint on span fields

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Suggestions scoring at or below this are dropped.
const SIMILARITY_FLOOR: f64 = 0.75;

/// One problem with the loaded configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(wachat::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recognized key here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(wachat::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(wachat::config::missing_key),
        help("add `{key} = <value>` to your wachat.toml")
    )]
    MissingKey { key: String },

    /// Parsed fine but out of range or malformed.
    #[error("validation error: {message}")]
    #[diagnostic(code(wachat::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(wachat::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let listing = format!("keys allowed in this section: {valid_keys}");
    suggestion.map_or_else(
        || listing.clone(),
        |s| format!("did you mean `{s}`? {listing}"),
    )
}

/// Split a figment error into one [`ConfigError`] per underlying failure.
///
/// `toml_sources` holds `(name, content)` pairs used to place spans.
pub fn figment_to_config_errors(
    err: FigmentError,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &FigmentError, toml_sources: &[(String, String)]) -> ConfigError {
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = locate(error, field, toml_sources).unzip();
            ConfigError::UnknownKey {
                key: field.to_string(),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: qualified(&error.path, field),
        },
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key: error.path.join("."),
            detail: format!("found {actual}, expected {expected}"),
            expected: expected.to_string(),
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

fn qualified(path: &[String], field: &str) -> String {
    match path {
        [] => field.to_string(),
        [.., last] if last == field => path.join("."),
        _ => format!("{}.{field}", path.join(".")),
    }
}

/// The TOML text that produced `error`, and the span of `field` within it.
fn locate(
    error: &FigmentError,
    field: &str,
    toml_sources: &[(String, String)],
) -> Option<(SourceSpan, NamedSource<String>)> {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|meta| meta.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline strings carry no file metadata; a lone source is unambiguous.
    let (name, content) = match origin {
        Some(path) => toml_sources.iter().find(|(name, _)| *name == path)?,
        None if toml_sources.len() == 1 => &toml_sources[0],
        None => return None,
    };

    let offset = find_key_offset(content, &error.path, field)?;
    Some((
        SourceSpan::new(offset.into(), field.len()),
        NamedSource::new(name, content.clone()),
    ))
}

/// Byte offset of `field` as a key, searched after the `[section]` header
/// named by the first element of `path` (or from the top when empty).
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    content[start..]
        .split_inclusive('\n')
        .scan(start, |line_start, line| {
            let at = *line_start;
            *line_start += line.len();
            Some((at, line))
        })
        .find_map(|(at, line)| {
            let indent = line.len() - line.trim_start().len();
            let rest = line.trim_start().strip_prefix(field)?;
            rest.starts_with([' ', '\t', '='])
                .then_some(at + indent)
        })
}

/// Closest entry of `valid_keys` to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SIMILARITY_FLOOR)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_base_ulr_for_base_url() {
        let valid = &["base_url", "api_key", "timeout_secs"];
        assert_eq!(suggest_key("base_ulr", valid), Some("base_url".to_string()));
    }

    #[test]
    fn suggest_request_delay() {
        let valid = &["request_delay_ms"];
        assert_eq!(
            suggest_key("request_dealy_ms", valid),
            Some("request_delay_ms".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["name", "log_level"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn find_key_offset_in_section() {
        let content = "[app]\nname = \"x\"\n\n[backend]\nbase_ulr = \"http://x\"\n";
        let path = vec!["backend".to_string()];
        let o = find_key_offset(content, &path, "base_ulr").unwrap();
        assert_eq!(&content[o..o + 8], "base_ulr");
    }

    #[test]
    fn find_key_offset_handles_indentation_and_crlf() {
        let content = "[sync]\r\n  request_dealy_ms = 5\r\n";
        let path = vec!["sync".to_string()];
        let o = find_key_offset(content, &path, "request_dealy_ms").unwrap();
        assert_eq!(&content[o..o + 16], "request_dealy_ms");
    }

    #[test]
    fn missing_key_is_qualified_by_section() {
        assert_eq!(qualified(&[], "name"), "name");
        assert_eq!(qualified(&["backend".into()], "base_url"), "backend.base_url");
        assert_eq!(qualified(&["backend".into(), "base_url".into()], "base_url"), "backend.base_url");
    }

    #[test]
    fn help_lists_keys_without_suggestion() {
        let help = unknown_key_help(None, "a, b");
        assert_eq!(help, "keys allowed in this section: a, b");
        assert!(unknown_key_help(Some("a"), "a, b").starts_with("did you mean `a`?"));
    }

    #[test]
    fn find_key_offset_missing_section() {
        let path = vec!["ingest".to_string()];
        assert_eq!(find_key_offset("[app]\nname = 1\n", &path, "name"), None);
    }
}
