//! Language Server Protocol (LSP) implementation for blueprint documents
//!
//!     Blueprints declare infrastructure resources, data sources, variables, values,
//!     includes and exports in either an indentation-based block format (`.yml`, `.yaml`)
//!     or JSON with comments (`.jsonc`). This crate wires the analysis layer into an
//!     editor through tower-lsp.
//!
//! Feature Set
//!
//!     1. Completion (textDocument/completion, completionItem/resolve):
//!         - Resource, data source, variable and value types from the registries
//!         - Definition fields, resource spec fields and link annotation keys
//!         - Known field values, allowed values and booleans
//!         - References and functions inside `${..}` substitutions
//!         - Documentation is fetched lazily when an item is resolved
//!
//!     2. Diagnostics (textDocument/publishDiagnostics):
//!         - Syntax errors from loading the document
//!         - Unknown or missing resource and data source types
//!         - Exports pointing at undeclared entities
//!
//!     3. Go to Definition (textDocument/definition):
//!         - From a substitution reference to the declaration it names
//!         - From export fields, `dependsOn` and link selector excludes to resources
//!         - From an include path to the included file
//!
//! Architecture
//!
//!     LSP Layer (tower-lsp):
//!         - JSON-RPC transport, capability negotiation, request routing
//!
//!     Server Layer (server.rs):
//!         - Implements the LanguageServer trait
//!         - Owns the document store: text, load result and settings per open document
//!         - Calls into the feature layer and converts results to protocol types
//!         - Tests use a recording client and a mock feature provider
//!
//!     Feature Layer (features/ and blueprint-analysis):
//!         - Works on a loaded document and the registries
//!         - Every registry call carries the deadline of the request that made it
//!
//! Configuration
//!
//!     Server-wide settings come from blueprint-config (embedded defaults plus an optional
//!     user file). Per-document settings start from those and follow
//!     `workspace/didChangeConfiguration`.
//!
//! Usage
//!
//!     $ blueprint-ls --config ~/.config/blueprint-ls/config.toml
//!     Starts the language server on stdin/stdout. Logs go to stderr.

pub mod features;
pub mod server;

pub use server::{BlueprintLanguageServer, DefaultFeatureProvider, FeatureOptions};
