//! # blueprint-model
//!
//! The collaborator boundary of the blueprint language server: the shapes the loader hands
//! over and the analysis crate consumes.
//!
//! File Layout
//!
//!     position.rs   1-indexed positions, node ranges and the normalized error location
//!     schema.rs     the blueprint document model (resources, variables, values, ...)
//!     tree.rs       positioned schema tree, structural paths and reference targets
//!     errors.rs     structured error taxonomy reported by loading and validation
//!     format.rs     surface syntax detection from file extensions
//!     loader.rs     the loader seam plus a serde-backed default implementation
//!
//! Everything in this crate speaks 1-indexed source coordinates. Protocol coordinates are
//! the analysis crate's concern.

pub mod errors;
pub mod format;
pub mod loader;
pub mod position;
pub mod schema;
pub mod tree;

pub use errors::{
    BlueprintError, CoreError, ErrorContext, ErrorLocation, LexError, LoadError, ParseError,
    ParseErrorKind, ReasonCode, RunError, SchemaError, SuggestedAction,
};
pub use format::{DocumentFormat, FormatError};
pub use loader::{BlueprintLoader, LoadedDocument, SerdeLoader};
pub use position::{ColumnConfidence, LineIndex, SourceLocation, SourcePosition, SourceRange};
pub use schema::{
    Blueprint, DataSource, DataSourceFieldExport, DataSourceFilter, DataSourceMetadata, Export,
    Include, LinkSelector, Resource, ResourceMetadata, ScalarValue, Value, Variable,
};
pub use tree::{Namespace, NodeKind, NodePath, ReferenceTarget, SchemaNode, SchemaTree};
