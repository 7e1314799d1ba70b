//! Loader boundary
//!
//! Turning blueprint text into a [`Blueprint`] and its positioned [`SchemaTree`] is the job
//! of an external loader. [`BlueprintLoader`] is the seam the language server depends on.
//!
//! [`SerdeLoader`] is the bundled fallback implementation: it deserializes the document
//! with `serde_yaml` or `json5` and reports syntax errors with their positions. It
//! does not build a schema tree, so consumers fall back to text heuristics for
//! everything that needs node positions.

use crate::errors::{BlueprintError, ParseError, ParseErrorKind};
use crate::format::DocumentFormat;
use crate::schema::Blueprint;
use crate::tree::SchemaTree;

/// Result of loading one document. Loading never fails outright: a document that cannot
/// be read still yields a [`LoadedDocument`] describing why.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDocument {
    pub blueprint: Option<Blueprint>,
    pub tree: Option<SchemaTree>,
    pub error: Option<BlueprintError>,
}

pub trait BlueprintLoader: Send + Sync + 'static {
    fn load(&self, content: &str, format: DocumentFormat) -> LoadedDocument;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeLoader;

impl SerdeLoader {
    pub fn new() -> Self {
        Self
    }
}

impl BlueprintLoader for SerdeLoader {
    fn load(&self, content: &str, format: DocumentFormat) -> LoadedDocument {
        let result = match format {
            DocumentFormat::Yaml => load_yaml(content),
            DocumentFormat::Jsonc => load_jsonc(content),
        };
        match result {
            Ok(blueprint) => LoadedDocument {
                blueprint: Some(blueprint),
                tree: None,
                error: None,
            },
            Err(error) => LoadedDocument {
                blueprint: None,
                tree: None,
                error: Some(BlueprintError::Parse(error)),
            },
        }
    }
}

fn load_yaml(content: &str) -> Result<Blueprint, ParseError> {
    if content.trim().is_empty() {
        return Ok(Blueprint::default());
    }
    // Untyped first so syntax and duplicate-key errors are reported before shape errors.
    serde_yaml::from_str::<serde_yaml::Value>(content).map_err(yaml_parse_error)?;
    serde_yaml::from_str(content).map_err(yaml_parse_error)
}

fn yaml_parse_error(err: serde_yaml::Error) -> ParseError {
    let (line, column) = err
        .location()
        .map(|location| (location.line(), location.column()))
        .unwrap_or((1, 1));
    let message = err.to_string();
    let kind = if message.contains("duplicate entry") {
        ParseErrorKind::DuplicateKey
    } else {
        ParseErrorKind::Syntax
    };
    ParseError {
        kind,
        message,
        line: line.max(1),
        column: column.max(1),
        end: None,
    }
}

fn load_jsonc(content: &str) -> Result<Blueprint, ParseError> {
    if content.trim().is_empty() {
        return Ok(Blueprint::default());
    }
    json5::from_str::<Blueprint>(content).map_err(jsonc_parse_error)
}

fn jsonc_parse_error(err: json5::Error) -> ParseError {
    let (line, column) = match &err {
        json5::Error::Message {
            location: Some(location),
            ..
        } => (location.line, location.column),
        _ => (1, 1),
    };
    ParseError::syntax(err.to_string(), line.max(1), column.max(1))
}
