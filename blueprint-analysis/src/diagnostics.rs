//! Diagnostics from structured blueprint errors
//!
//! Loading and validation report a tree of errors in four located shapes. This module
//! flattens that tree into editor diagnostics:
//!
//! - Errors that wrap child errors are not reported themselves; each leaf is.
//! - A leaf without a line borrows the location of its nearest located ancestor, and falls
//!   back to the first line of the document.
//! - Columns are only trusted when the error says they are exact (see
//!   [`location_to_protocol_range`]).
//! - Errors that only make sense while deploying are dropped.
//!
//! The final list holds each `(range, severity, message)` once.

use crate::position::location_to_protocol_range;
use blueprint_model::{
    BlueprintError, ErrorContext, ErrorLocation, ParseError, ParseErrorKind, ReasonCode,
    SourceLocation,
};
use lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

pub const SOURCE_SYNTAX: &str = "blueprint-syntax";
pub const SOURCE_VALIDATOR: &str = "blueprint-validator";
pub const DUPLICATE_KEY_CODE: &str = "duplicate_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticOptions {
    /// How many available fields a message lists before summarizing the rest.
    pub max_available_fields: usize,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            max_available_fields: 8,
        }
    }
}

fn default_range() -> Range {
    Range::new(Position::new(0, 0), Position::new(1, 0))
}

/// Flatten `error` into de-duplicated diagnostics.
pub fn collect_diagnostics(error: &BlueprintError, options: &DiagnosticOptions) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    walk(error, None, options, &mut diagnostics);
    diagnostics
}

fn walk(
    error: &BlueprintError,
    ancestor: Option<Range>,
    options: &DiagnosticOptions,
    out: &mut Vec<Diagnostic>,
) {
    match error {
        BlueprintError::Load(load) if !load.child_errors.is_empty() => {
            let located = location_to_protocol_range(&load.location()).or(ancestor);
            for child in &load.child_errors {
                walk(child, located, options, out);
            }
        }
        BlueprintError::Load(load) => {
            let code = (load.reason == ReasonCode::DuplicateKey).then_some(DUPLICATE_KEY_CODE);
            let message = build_message(&load.message, load.context.as_ref(), options);
            leaf(out, load.location(), ancestor, message, SOURCE_VALIDATOR, code);
        }
        BlueprintError::Schema(schema) => leaf(
            out,
            schema.location(),
            ancestor,
            schema.message.clone(),
            SOURCE_VALIDATOR,
            None,
        ),
        BlueprintError::Parse(parse) => parse_leaf(out, parse, ancestor),
        BlueprintError::ParseErrors(errors) => {
            for parse in errors {
                parse_leaf(out, parse, ancestor);
            }
        }
        BlueprintError::Lex(lex) => leaf(
            out,
            lex.location(),
            ancestor,
            lex.message.clone(),
            SOURCE_SYNTAX,
            None,
        ),
        BlueprintError::LexErrors(errors) => {
            for lex in errors {
                leaf(
                    out,
                    lex.location(),
                    ancestor,
                    lex.message.clone(),
                    SOURCE_SYNTAX,
                    None,
                );
            }
        }
        BlueprintError::Core(core) => leaf(
            out,
            core.location.unwrap_or_default(),
            ancestor,
            core.message.clone(),
            SOURCE_VALIDATOR,
            None,
        ),
        BlueprintError::Run(_) => {}
        BlueprintError::Other(message) => leaf(
            out,
            SourceLocation::default(),
            ancestor,
            message.clone(),
            SOURCE_VALIDATOR,
            None,
        ),
    }
}

fn parse_leaf(out: &mut Vec<Diagnostic>, parse: &ParseError, ancestor: Option<Range>) {
    let code = (parse.kind == ParseErrorKind::DuplicateKey).then_some(DUPLICATE_KEY_CODE);
    leaf(
        out,
        parse.location(),
        ancestor,
        parse.message.clone(),
        SOURCE_SYNTAX,
        code,
    );
}

fn leaf(
    out: &mut Vec<Diagnostic>,
    location: SourceLocation,
    ancestor: Option<Range>,
    message: String,
    source: &str,
    code: Option<&str>,
) {
    let range = location_to_protocol_range(&location)
        .or(ancestor)
        .unwrap_or_else(default_range);
    push_unique(
        out,
        Diagnostic {
            range,
            severity: Some(DiagnosticSeverity::ERROR),
            code: code.map(|code| NumberOrString::String(code.to_string())),
            source: Some(source.to_string()),
            message,
            ..Diagnostic::default()
        },
    );
}

fn push_unique(out: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    let duplicate = out.iter().any(|existing| {
        existing.range == diagnostic.range
            && existing.severity == diagnostic.severity
            && existing.message == diagnostic.message
    });
    if !duplicate {
        out.push(diagnostic);
    }
}

/// The error message followed by whatever remediation data the error carries.
pub fn build_message(
    message: &str,
    context: Option<&ErrorContext>,
    options: &DiagnosticOptions,
) -> String {
    let Some(context) = context else {
        return message.to_string();
    };
    let mut lines = vec![message.to_string()];

    if !context.suggestions.is_empty() {
        lines.push(format!("Did you mean: {}?", context.suggestions.join(", ")));
    }

    if !context.available_fields.is_empty() {
        let shown = context.available_fields.len().min(options.max_available_fields);
        let mut listed = context.available_fields[..shown].join(", ");
        let hidden = context.available_fields.len() - shown;
        if hidden > 0 {
            listed.push_str(&format!(", ... ({hidden} more)"));
        }
        lines.push(format!("Available fields: {listed}"));
    }

    if !context.suggested_actions.is_empty() {
        lines.push("Suggested actions:".to_string());
        for (idx, action) in context.suggested_actions.iter().enumerate() {
            match &action.description {
                Some(description) => {
                    lines.push(format!("{}. {}: {}", idx + 1, action.title, description))
                }
                None => lines.push(format!("{}. {}", idx + 1, action.title)),
            }
        }
    }

    lines.join("\n")
}
