//! Insert-text formatting for completion items
//!
//! The same completion value needs different text depending on the surface syntax and on
//! what the user already typed in front of the cursor: a leading quote in compact JSON, a
//! value that would change meaning in the block format unless quoted, or a map key that
//! can only be reached with bracket access.

use blueprint_model::DocumentFormat;
use once_cell::sync::Lazy;
use regex::Regex;

/// Words the block format would read as booleans or null when left unquoted.
const YAML_RESERVED_WORDS: &[&str] = &["true", "false", "yes", "no", "on", "off", "null", "~"];

static REGULAR_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("regular key regex"));

/// Characters that give a block-format scalar structural meaning.
const YAML_INDICATORS: &[char] = &[
    ':', '#', '[', ']', '{', '}', ',', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
];

/// Check whether a block-format value must be quoted to keep its string meaning.
///
/// Numbers stay bare so that allowed values of numeric fields keep their type.
pub fn yaml_requires_quotes(value: &str) -> bool {
    value.is_empty()
        || YAML_RESERVED_WORDS.contains(&value.to_ascii_lowercase().as_str())
        || value.contains(YAML_INDICATORS)
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Format `value` as the insert text of a completion item.
///
/// - Compact JSON with a quote already typed: the bare value followed by a closing quote.
/// - Compact JSON without one: a quoted literal, prefixed with a space unless one already
///   precedes the cursor.
/// - Block format with a quote already typed: the value followed by a closing quote.
/// - Block format otherwise: the value, quoted only when it would change meaning bare.
pub fn format_value(
    value: &str,
    format: DocumentFormat,
    has_leading_quote: bool,
    has_leading_space: bool,
) -> String {
    match format {
        DocumentFormat::Jsonc if has_leading_quote => format!("{value}\""),
        DocumentFormat::Jsonc if has_leading_space => quote(value),
        DocumentFormat::Jsonc => format!(" {}", quote(value)),
        DocumentFormat::Yaml if has_leading_quote => format!("{value}\""),
        DocumentFormat::Yaml if yaml_requires_quotes(value) => quote(value),
        DocumentFormat::Yaml => value.to_string(),
    }
}

/// What the user typed in front of the cursor on the current line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedPrefix {
    /// The word being typed, without any opening quote.
    pub text: String,
    /// 0-indexed column where `text` starts.
    pub start_column: u32,
    pub has_leading_quote: bool,
    pub has_leading_space: bool,
}

/// Extract the word under construction from the text before the cursor.
///
/// A word stops at whitespace, quotes, colons, commas and brackets. The characters just
/// before the word decide whether a quote or a space is already in place.
pub fn typed_prefix(line_before: &str) -> TypedPrefix {
    let chars: Vec<char> = line_before.chars().collect();
    let start = chars
        .iter()
        .rposition(|c| c.is_whitespace() || "\"':,[]{}".contains(*c))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let text: String = chars[start..].iter().collect();
    let before = start.checked_sub(1).map(|idx| chars[idx]);
    let has_leading_quote = matches!(before, Some('"') | Some('\''));
    let has_leading_space = match before {
        Some(c) if c.is_whitespace() => true,
        Some('"') | Some('\'') => start >= 2 && chars[start - 2].is_whitespace(),
        _ => false,
    };
    TypedPrefix {
        text,
        start_column: start as u32,
        has_leading_quote,
        has_leading_space,
    }
}

/// Check whether a map key needs bracket access because dot access cannot express it.
pub fn is_irregular_key(key: &str) -> bool {
    !REGULAR_KEY.is_match(key)
}

/// How a map key is being accessed at the cursor inside a substitution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyAccess {
    /// `[` was typed right before the key.
    pub open_bracket: bool,
    /// A quote was typed after the open bracket.
    pub open_quote: Option<char>,
    /// Quote of the string literal enclosing the whole substitution, if any.
    pub enclosing_quote: Option<char>,
}

impl KeyAccess {
    /// Quote to use for new bracket accessors. It must not terminate the enclosing string.
    fn quote_char(&self) -> char {
        if let Some(open) = self.open_quote {
            return open;
        }
        match self.enclosing_quote {
            Some('"') => '\'',
            _ => '"',
        }
    }
}

/// Format a map key as a path continuation.
///
/// Regular keys are inserted bare. Irregular keys become a full `["key"]` accessor. After
/// an already-open bracket only the remainder is emitted: `"key"]`, or `key"]` when the
/// quote was typed too.
pub fn format_map_key_access(key: &str, access: &KeyAccess) -> String {
    let quote = access.quote_char();
    match (access.open_bracket, access.open_quote) {
        (true, Some(_)) => format!("{key}{quote}]"),
        (true, None) => format!("{quote}{key}{quote}]"),
        (false, _) if is_irregular_key(key) => format!("[{quote}{key}{quote}]"),
        (false, _) => key.to_string(),
    }
}
