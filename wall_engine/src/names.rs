//! Canonical name forms used for every whitelist and deny-list lookup.
//!
//! Two names that differ only by quoting or letter case normalize to the same
//! string, and normalization is idempotent.

use std::borrow::Cow;

/// Return the identifier without one pair of surrounding quotes.
///
/// Recognizes `"double"`, `` `backtick` `` and `[bracket]` quoting.
#[must_use]
pub fn unquote_identifier(ident: &str) -> &str {
    let pairs = [('"', '"'), ('`', '`'), ('[', ']')];
    for (open, close) in pairs {
        if ident.len() >= 2 && ident.starts_with(open) && ident.ends_with(close) {
            return &ident[open.len_utf8()..ident.len() - close.len_utf8()];
        }
    }
    ident
}

/// Normalize a single identifier for case-insensitive matching.
///
/// Trims whitespace and strips surrounding quotes until neither changes the
/// value, then lowercases ASCII letters.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut current = name;
    loop {
        let next = unquote_identifier(current.trim());
        if next == current {
            break;
        }
        current = next;
    }
    current.to_ascii_lowercase()
}

/// Split a possibly qualified name on dots that are not inside quotes.
///
/// `"my.schema".orders` yields `["\"my.schema\"", "orders"]`.
#[must_use]
pub fn split_qualified(name: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0usize;

    for (idx, ch) in name.char_indices() {
        match (quote, ch) {
            (None, '"') | (None, '`') => quote = Some(ch),
            (None, '[') => quote = Some(']'),
            (Some(q), c) if c == q => quote = None,
            (None, '.') => {
                parts.push(&name[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&name[start..]);
    parts
}

/// Normalize a possibly qualified name part by part.
///
/// `"Sales"."Orders"` and `sales.orders` both become `sales.orders`.
#[must_use]
pub fn normalize_qualified(name: &str) -> String {
    split_qualified(name)
        .into_iter()
        .map(normalize_name)
        .collect::<Vec<_>>()
        .join(".")
}

/// Terminal component of an already-normalized qualified name.
#[must_use]
pub fn relation_part(normalized: &str) -> &str {
    normalized.rsplit('.').next().unwrap_or(normalized)
}

/// Scope keywords accepted between `@@` and a system variable name.
const VARIABLE_SCOPES: &[&str] = &["global", "session", "local", "persist", "persist_only"];

/// Drop the scope from a normalized system variable reference.
///
/// `@@global.version` and `@@session.version` both become `@@version`.
/// Anything else is returned unchanged.
#[must_use]
pub fn strip_variable_scope(normalized: &str) -> Cow<'_, str> {
    let Some(rest) = normalized.strip_prefix("@@") else {
        return Cow::Borrowed(normalized);
    };
    match rest.split_once('.') {
        Some((scope, name)) if VARIABLE_SCOPES.contains(&scope) && !name.is_empty() => {
            Cow::Owned(format!("@@{name}"))
        }
        _ => Cow::Borrowed(normalized),
    }
}
