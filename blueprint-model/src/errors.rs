//! Structured errors reported while loading and validating blueprints
//!
//! Four error kinds carry positions, each in its own shape:
//!
//! - [`LoadError`]: nestable, with a reason code, contextual remediation data and a full
//!   location including an optional end position.
//! - [`SchemaError`]: a start position and an accuracy flag, no end.
//! - [`ParseError`]: a start position and an optional end position, always exact.
//! - [`LexError`]: a bare line/column pair, always exact.
//!
//! [`ErrorLocation`] normalizes all four into a [`SourceLocation`]. [`CoreError`] and
//! [`RunError`] complete the taxonomy; the latter is only meaningful while a blueprint is
//! being executed.

use crate::position::{ColumnConfidence, SourceLocation};
use thiserror::Error;

/// Normalizes the position data of an error into a [`SourceLocation`].
pub trait ErrorLocation {
    fn location(&self) -> SourceLocation;
}

/// Any error produced by the loader or validator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlueprintError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{} parse errors", .0.len())]
    ParseErrors(Vec<ParseError>),
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("{} lex errors", .0.len())]
    LexErrors(Vec<LexError>),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("{0}")]
    Other(String),
}

/// Machine-readable reason attached to a [`LoadError`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    DuplicateKey,
    MissingType,
    InvalidResource,
    InvalidDataSource,
    InvalidReference,
    MultipleValidationErrors,
    Other(String),
}

impl ReasonCode {
    pub fn as_str(&self) -> &str {
        match self {
            ReasonCode::DuplicateKey => "duplicate_key",
            ReasonCode::MissingType => "missing_type",
            ReasonCode::InvalidResource => "invalid_resource",
            ReasonCode::InvalidDataSource => "invalid_data_source",
            ReasonCode::InvalidReference => "invalid_reference",
            ReasonCode::MultipleValidationErrors => "multiple_validation_errors",
            ReasonCode::Other(code) => code,
        }
    }
}

/// A remediation step attached to an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedAction {
    pub title: String,
    pub description: Option<String>,
}

/// Contextual metadata that enriches the user-facing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Close matches for a misspelled name.
    pub suggestions: Vec<String>,
    /// Names that would have been accepted at this position.
    pub available_fields: Vec<String>,
    pub suggested_actions: Vec<SuggestedAction>,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct LoadError {
    pub reason: ReasonCode,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub end_line: Option<usize>,
    pub end_column: Option<usize>,
    pub column_accuracy: ColumnConfidence,
    pub context: Option<ErrorContext>,
    pub child_errors: Vec<BlueprintError>,
}

impl LoadError {
    pub fn new(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            line: None,
            column: None,
            end_line: None,
            end_column: None,
            column_accuracy: ColumnConfidence::Unknown,
            context: None,
            child_errors: Vec::new(),
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.line = location.line;
        self.column = location.column;
        self.end_line = location.end_line;
        self.end_column = location.end_column;
        self.column_accuracy = location.column_confidence;
        self
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_children(mut self, children: Vec<BlueprintError>) -> Self {
        self.child_errors = children;
        self
    }
}

impl ErrorLocation for LoadError {
    fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            end_line: self.end_line,
            end_column: self.end_column,
            column_confidence: self.column_accuracy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SchemaError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub column_accuracy: ColumnConfidence,
}

impl ErrorLocation for SchemaError {
    fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            end_line: None,
            end_column: None,
            column_confidence: self.column_accuracy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    Syntax,
    DuplicateKey,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub end: Option<(usize, usize)>,
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind: ParseErrorKind::Syntax,
            message: message.into(),
            line,
            column,
            end: None,
        }
    }
}

impl ErrorLocation for ParseError {
    fn location(&self) -> SourceLocation {
        let location = SourceLocation::new(self.line, self.column, ColumnConfidence::Exact);
        match self.end {
            Some((end_line, end_column)) => location.with_end(end_line, end_column),
            None => location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ErrorLocation for LexError {
    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, ColumnConfidence::Exact)
    }
}

/// Failure evaluating a core expression (substitution functions, conditions).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct CoreError {
    pub message: String,
    pub location: Option<SourceLocation>,
}

/// Failure that only surfaces while a blueprint is deployed; ignored by static validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RunError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_round_trips_location() {
        let location = SourceLocation::new(10, 5, ColumnConfidence::Approximate).with_end(12, 1);
        let error = LoadError::new(ReasonCode::InvalidResource, "bad resource").at(location);
        assert_eq!(error.location(), location);
        assert_eq!(error.to_string(), "bad resource");
    }

    #[test]
    fn parse_and_lex_errors_are_exact() {
        let parse = ParseError::syntax("unexpected ':'", 3, 7);
        assert_eq!(parse.location().column_confidence, ColumnConfidence::Exact);
        assert_eq!(parse.location().end_line, None);

        let lex = LexError {
            message: "unterminated string".into(),
            line: 2,
            column: 1,
        };
        assert_eq!(lex.location(), SourceLocation::new(2, 1, ColumnConfidence::Exact));
    }

    #[test]
    fn batched_errors_describe_their_size() {
        let batch = BlueprintError::ParseErrors(vec![
            ParseError::syntax("a", 1, 1),
            ParseError::syntax("b", 2, 1),
        ]);
        assert_eq!(batch.to_string(), "2 parse errors");
        assert_eq!(ReasonCode::DuplicateKey.as_str(), "duplicate_key");
    }
}
