//! # blueprint-analysis
//!
//! Editor-agnostic analysis of blueprint documents. Every feature takes a loaded
//! [`DocumentContext`] plus 1-indexed source positions and answers in `lsp-types` values,
//! so the server crate only has to move data across the protocol.
//!
//! File Layout
//!
//!     position.rs      translation between source and protocol coordinates
//!     substitution.rs  parsing of the `${..}` reference path under the cursor
//!     formatter.rs     value quoting, typed prefixes and map-key access
//!     links.rs         link relationships between declared resources
//!     context.rs       classification of the cursor into a completion context
//!     completion/      the completion dispatcher and its strategies
//!     diagnostics.rs   structured errors to editor diagnostics
//!     definition.rs    go to definition
//!     validation.rs    registry-backed checks feeding the diagnostics
//!     outline.rs       positioned trees rebuilt from document text
//!     registry/        provider registries and the request context
//!     resolve.rs       lazy documentation for completion items
//!     includes.rs      child blueprints behind `include`
//!     cache.rs         keyed caches with explicit invalidation
//!     fields.rs        definition-field tables for every blueprint section
//!     document.rs      the per-document analysis input
//!
//! Registries are plugin-backed and may be slow. Every call carries a [`RequestContext`];
//! a failed or expired call degrades the feature to an empty answer.

pub mod cache;
pub mod completion;
pub mod context;
pub mod definition;
pub mod diagnostics;
pub mod document;
pub mod fields;
pub mod formatter;
pub mod includes;
pub mod links;
pub mod outline;
pub mod position;
pub mod registry;
pub mod resolve;
pub mod substitution;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use completion::{
    CandidateEdit, CompletionCandidate, CompletionList, CompletionOptions, CompletionService,
};
pub use context::{classify, CompletionContextKind, CursorContext};
pub use definition::{find_definition, DefinitionLink};
pub use diagnostics::{collect_diagnostics, DiagnosticOptions};
pub use document::DocumentContext;
pub use includes::{ChildBlueprints, FileChildSource};
pub use registry::{InMemoryRegistry, Registries, RegistryError, RequestContext};
pub use resolve::{resolve_documentation, ResolveData};
pub use validation::validate_blueprint;
