//! Substitution path parsing
//!
//! Inside `${..}` the user types references such as `resources.orders.spec.tableName` or
//! `values.config["api.url"]`. Completion needs to know which namespace and entity the
//! committed part of that path points at, how far into the entity the path goes, and which
//! partially typed segment should filter the candidates.

use crate::formatter::KeyAccess;
use blueprint_model::{Blueprint, Namespace};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstitutionError {
    #[error("no open substitution before the cursor")]
    NoActiveSubstitution,
}

/// The substitution the cursor is inside of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSubstitution {
    /// Text between `${` and the cursor.
    pub inner: String,
    /// 0-indexed character column of the first character after `${`.
    pub start_column: u32,
    /// Quote of the string literal that encloses the substitution.
    pub enclosing_quote: Option<char>,
}

/// Find the nearest `${` before the cursor that has not been closed yet.
///
/// `line_before` is the current line up to the cursor.
pub fn active_substitution(line_before: &str) -> Result<ActiveSubstitution, SubstitutionError> {
    let opener = line_before
        .rfind("${")
        .ok_or(SubstitutionError::NoActiveSubstitution)?;
    let inner = &line_before[opener + 2..];
    if inner.contains('}') {
        return Err(SubstitutionError::NoActiveSubstitution);
    }
    let prefix = &line_before[..opener];
    Ok(ActiveSubstitution {
        inner: inner.to_string(),
        start_column: (prefix.chars().count() + 2) as u32,
        enclosing_quote: open_quote(prefix),
    })
}

/// The quote character of a string literal left open in `text`, if any.
pub(crate) fn open_quote(text: &str) -> Option<char> {
    let mut open: Option<char> = None;
    let mut escaped = false;
    for ch in text.chars() {
        match open {
            Some(_) if escaped => escaped = false,
            Some('"') if ch == '\\' => escaped = true,
            Some(quote) if ch == quote => open = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => open = Some(ch),
            None => {}
        }
    }
    open
}

/// A reference path split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePath {
    pub namespace: Namespace,
    /// The referenced entity, absent while only the namespace has been committed.
    pub entity_name: Option<String>,
    /// Committed segments past the entity name, with bracket accessors normalized.
    pub path: Vec<String>,
    /// Partially typed trailing segment.
    pub filter_prefix: String,
    /// Everything before the filter prefix, verbatim.
    pub committed: String,
    pub access: KeyAccess,
}

impl ReferencePath {
    /// Full text of the path when `continuation` completes the trailing segment.
    pub fn completed_with(&self, continuation: &str) -> String {
        format!("{}{}", self.committed, continuation)
    }
}

struct Split {
    committed: String,
    filter_prefix: String,
    segments: Vec<String>,
    open_bracket: bool,
    open_quote: Option<char>,
}

/// Split the text inside a substitution at its last unquoted separator.
fn split_path(inner: &str) -> Split {
    let chars: Vec<char> = inner.chars().collect();
    let mut quote: Option<char> = None;
    let mut last_separator: Option<usize> = None;
    let mut quote_start: Option<usize> = None;
    let mut segments = Vec::new();
    let mut current = String::new();

    for (idx, &ch) in chars.iter().enumerate() {
        match quote {
            Some(open) if ch == open => {
                quote = None;
                quote_start = None;
            }
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                quote_start = Some(idx);
            }
            None if ch == '.' || ch == '[' || ch == ']' => {
                if !current.trim().is_empty() {
                    segments.push(current.trim().to_string());
                }
                current.clear();
                last_separator = Some(idx);
            }
            None => current.push(ch),
        }
    }

    // Inside an open quote the committed part ends at that quote.
    let (committed_end, open_quote) = match (quote, quote_start) {
        (Some(open), Some(start)) => (start + 1, Some(open)),
        _ => (last_separator.map(|idx| idx + 1).unwrap_or(0), None),
    };
    let committed: String = chars[..committed_end].iter().collect();
    let filter_prefix: String = chars[committed_end..].iter().collect();
    let open_bracket = match open_quote {
        Some(_) => committed_end >= 2 && chars[committed_end - 2] == '[',
        None => committed.ends_with('['),
    };

    Split {
        committed,
        filter_prefix,
        segments,
        open_bracket,
        open_quote,
    }
}

/// Parse the text inside a substitution into a [`ReferencePath`].
///
/// The first committed segment is either a namespace prefix (`resources`, `datasources`,
/// `variables`, `values`, `children`) or the name of a declared resource, which is
/// shorthand for `resources.<name>`. Returns `None` when nothing has been committed yet,
/// when the first segment is neither, or when the entity is not declared in `blueprint`.
pub fn parse_reference_path(inner: &str, blueprint: &Blueprint) -> Option<ReferencePath> {
    let split = split_path(inner.trim_start());
    let (first, rest) = split.segments.split_first()?;

    let (namespace, entity_name, path) = match Namespace::from_prefix(first) {
        Some(namespace) => {
            let entity = rest.first().cloned();
            let path = rest.iter().skip(1).cloned().collect::<Vec<_>>();
            (namespace, entity, path)
        }
        None if blueprint.resources.contains_key(first) => {
            (Namespace::Resources, Some(first.clone()), rest.to_vec())
        }
        None => return None,
    };

    if let Some(name) = &entity_name {
        if !blueprint.names_in(namespace).contains(&name.as_str()) {
            return None;
        }
    }

    Some(ReferencePath {
        namespace,
        entity_name,
        path,
        filter_prefix: split.filter_prefix,
        committed: split.committed,
        access: KeyAccess {
            open_bracket: split.open_bracket,
            open_quote: split.open_quote,
            enclosing_quote: None,
        },
    })
}
