//! Completion
//!
//! [`CompletionService::complete`] classifies the cursor, short-circuits kinds that are
//! disabled for the document's format, and routes every other kind to one strategy.
//! Strategies return unfiltered candidates with formatted insert text; the dispatcher
//! filters them by the typed prefix, turns insert text into edits and ranks the result.
//!
//! Strategies live in:
//!
//!     types.rs          registry-provided and core type names
//!     fields.rs         field names of definitions, spec fields, link annotation keys
//!     values.rs         values of known fields
//!     substitutions.rs  references inside `${..}` and reference-valued fields

mod fields;
mod substitutions;
mod types;
mod values;

use crate::cache::LinkDefinitionCache;
use crate::context::{classify, CompletionContextKind, CursorContext};
use crate::document::DocumentContext;
use crate::fields as tables;
use crate::formatter::format_value;
use crate::includes::ChildBlueprints;
use crate::position::to_protocol;
use crate::registry::{Registries, RegistryError, RequestContext, SpecSchema};
use crate::resolve::ResolveData;
use blueprint_model::{Blueprint, DocumentFormat, SourcePosition};
use lsp_types::{CompletionItemKind, Position, Range};
use std::sync::Arc;
use tracing::{debug, warn};

/// A text edit replacing what was typed with the completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEdit {
    pub range: Range,
    pub new_text: String,
}

/// Describes a semantic completion candidate that can be translated into protocol specific items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    pub label: String,
    pub detail: Option<String>,
    pub kind: CompletionItemKind,
    pub insert_text: Option<String>,
    pub edit: Option<CandidateEdit>,
    pub filter_text: Option<String>,
    pub sort_text: Option<String>,
    /// Markdown.
    pub documentation: Option<String>,
    pub resolve: Option<ResolveData>,
}

impl CompletionCandidate {
    pub(crate) fn new(label: impl Into<String>, kind: CompletionItemKind) -> Self {
        Self {
            label: label.into(),
            detail: None,
            kind,
            insert_text: None,
            edit: None,
            filter_text: None,
            sort_text: None,
            documentation: None,
            resolve: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn with_insert_text(mut self, text: impl Into<String>) -> Self {
        self.insert_text = Some(text.into());
        self
    }

    pub(crate) fn with_documentation(mut self, documentation: Option<String>) -> Self {
        self.documentation = documentation;
        self
    }

    pub(crate) fn with_resolve(mut self, data: ResolveData) -> Self {
        self.resolve = Some(data);
        self
    }

    pub(crate) fn with_filter_text(mut self, text: impl Into<String>) -> Self {
        self.filter_text = Some(text.into());
        self
    }

    fn insert_text_or_label(&self) -> &str {
        self.insert_text.as_deref().unwrap_or(&self.label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionList {
    pub is_incomplete: bool,
    pub items: Vec<CompletionCandidate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOptions {
    /// Columns past the end of a node that still count as inside it.
    pub cursor_leeway: usize,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self { cursor_leeway: 2 }
    }
}

/// Outcome of looking up what a plugin knows about a declared entity's type.
pub(crate) enum TypeLookup<T> {
    Found(T),
    /// The entity declares a type no plugin provides.
    Unknown(String),
    /// The entity has no type, or the type carries nothing to look up.
    Untyped,
}

/// Inputs shared by every strategy for one request.
pub(crate) struct Request<'a> {
    pub ctx: &'a RequestContext,
    pub document: &'a DocumentContext,
    pub cursor: &'a CursorContext,
    pub position: SourcePosition,
    pub registries: &'a Registries,
    pub links: &'a LinkDefinitionCache,
    pub children: &'a ChildBlueprints,
}

impl Request<'_> {
    pub fn blueprint(&self) -> Option<&Blueprint> {
        self.document.blueprint.as_ref()
    }

    /// Insert text for a plain value at the cursor.
    pub fn value_text(&self, value: &str) -> String {
        let prefix = &self.cursor.prefix;
        format_value(
            value,
            self.document.format,
            prefix.has_leading_quote,
            prefix.has_leading_space,
        )
    }

    /// Insert text for a literal that must not be quoted, such as a boolean.
    pub fn literal_text(&self, literal: &str) -> String {
        let prefix = &self.cursor.prefix;
        match self.document.format {
            DocumentFormat::Jsonc if !prefix.has_leading_space && !prefix.has_leading_quote => {
                format!(" {literal}")
            }
            _ => literal.to_string(),
        }
    }

    /// The spec schema of the resource `name`, as registered for its type.
    pub fn resource_spec(&self, name: &str) -> TypeLookup<SpecSchema> {
        let Some(resource_type) = self
            .blueprint()
            .and_then(|blueprint| blueprint.resource(name))
            .and_then(|resource| resource.resource_type.clone())
        else {
            return TypeLookup::Untyped;
        };
        let resources = &self.registries.resources;
        match resources.has_resource_type(self.ctx, &resource_type) {
            Ok(true) => {}
            Ok(false) => return TypeLookup::Unknown(resource_type),
            Err(err) => {
                warn!(%resource_type, error = %err, "resource type lookup failed");
                return TypeLookup::Untyped;
            }
        }
        match self.registry(
            "spec definition",
            resources.spec_definition(self.ctx, &resource_type),
        ) {
            Some(schema) => TypeLookup::Found(schema),
            None => TypeLookup::Untyped,
        }
    }

    /// The type of the data source `name`, when a plugin provides it.
    pub fn data_source_type(&self, name: &str) -> TypeLookup<String> {
        let Some(data_source_type) = self
            .blueprint()
            .and_then(|blueprint| blueprint.data_sources.get(name))
            .and_then(|data_source| data_source.data_source_type.clone())
        else {
            return TypeLookup::Untyped;
        };
        match self
            .registries
            .data_sources
            .has_data_source_type(self.ctx, &data_source_type)
        {
            Ok(true) => TypeLookup::Found(data_source_type),
            Ok(false) => TypeLookup::Unknown(data_source_type),
            Err(err) => {
                warn!(%data_source_type, error = %err, "data source type lookup failed");
                TypeLookup::Untyped
            }
        }
    }

    /// Unwrap a registry result, logging and dropping failures.
    pub fn registry<T: Default>(&self, what: &str, result: Result<T, RegistryError>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                warn!(%what, error = %err, "registry call failed during completion");
                T::default()
            }
        }
    }

    /// The single hint item shown when the provider of `type_name` is not registered.
    pub fn not_found_hint(&self, what: &str, type_name: &str) -> CompletionCandidate {
        let typed = match &self.cursor.substitution {
            Some(substitution) => substitution.filter_prefix().to_string(),
            None => self.cursor.prefix.text.clone(),
        };
        CompletionCandidate::new(
            format!("{what} type \"{type_name}\" not found"),
            CompletionItemKind::TEXT,
        )
        .with_detail("No plugin provides this type")
        .with_insert_text(typed.clone())
        .with_filter_text(typed)
    }
}

/// Case-insensitive prefix match used to filter candidates.
pub(crate) fn matches_prefix(candidate: &str, prefix: &str) -> bool {
    candidate
        .to_lowercase()
        .starts_with(&prefix.to_lowercase())
}

pub struct CompletionService {
    registries: Registries,
    links: LinkDefinitionCache,
    children: Arc<ChildBlueprints>,
    options: CompletionOptions,
}

impl CompletionService {
    pub fn new(
        registries: Registries,
        children: Arc<ChildBlueprints>,
        options: CompletionOptions,
    ) -> Self {
        Self {
            registries,
            links: LinkDefinitionCache::new(),
            children,
            options,
        }
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn link_cache(&self) -> &LinkDefinitionCache {
        &self.links
    }

    pub fn children(&self) -> &ChildBlueprints {
        &self.children
    }

    pub fn options(&self) -> CompletionOptions {
        self.options
    }

    /// Completion candidates for the cursor at `position` (1-indexed).
    pub fn complete(
        &self,
        ctx: &RequestContext,
        document: &DocumentContext,
        position: SourcePosition,
    ) -> CompletionList {
        let cursor = classify(document, position, self.options.cursor_leeway);
        debug!(kind = ?cursor.kind, uri = %document.uri, "completion context");
        if !cursor.kind.enabled_for(document.format) {
            return CompletionList::default();
        }

        let request = Request {
            ctx,
            document,
            cursor: &cursor,
            position,
            registries: &self.registries,
            links: &self.links,
            children: &self.children,
        };
        let candidates = dispatch(&request);
        let cursor_position = to_protocol(position);

        let items = match &cursor.substitution {
            Some(substitution) => {
                let filter = substitution.filter_prefix().trim_start().to_string();
                let filtered = candidates
                    .into_iter()
                    .filter(|item| {
                        matches_prefix(item.filter_text.as_deref().unwrap_or(&item.label), &filter)
                    })
                    .collect();
                substitutions::finalize(filtered, substitution, cursor_position)
            }
            None => finalize_plain(candidates, &cursor, cursor_position),
        };

        CompletionList {
            is_incomplete: false,
            items: rank(items),
        }
    }
}

fn dispatch(request: &Request<'_>) -> Vec<CompletionCandidate> {
    use CompletionContextKind::*;
    match request.cursor.kind {
        ResourceType => types::resource_types(request),
        DataSourceType => types::data_source_types(request),
        VariableType => types::variable_types(request),
        ValueType | ExportType => types::core_types(request, tables::VALUE_TYPES),
        DataSourceExportType => types::core_types(request, tables::DATA_SOURCE_EXPORT_TYPES),

        BlueprintTopLevelField => fields::definition_fields(request, tables::BLUEPRINT_TOP_LEVEL_FIELDS),
        ResourceDefinitionField => fields::definition_fields(request, tables::RESOURCE_FIELDS),
        ResourceMetadataField => fields::definition_fields(request, tables::RESOURCE_METADATA_FIELDS),
        LinkSelectorField => fields::definition_fields(request, tables::LINK_SELECTOR_FIELDS),
        VariableDefinitionField => fields::definition_fields(request, tables::VARIABLE_FIELDS),
        ValueDefinitionField => fields::definition_fields(request, tables::VALUE_FIELDS),
        DataSourceDefinitionField => fields::definition_fields(request, tables::DATA_SOURCE_FIELDS),
        DataSourceMetadataField => {
            fields::definition_fields(request, tables::DATA_SOURCE_METADATA_FIELDS)
        }
        DataSourceFilterDefinitionField => {
            fields::definition_fields(request, tables::DATA_SOURCE_FILTER_FIELDS)
        }
        DataSourceExportDefinitionField => {
            fields::definition_fields(request, tables::DATA_SOURCE_EXPORT_FIELDS)
        }
        IncludeDefinitionField => fields::definition_fields(request, tables::INCLUDE_FIELDS),
        ExportDefinitionField => fields::definition_fields(request, tables::EXPORT_FIELDS),
        ResourceSpecField => fields::spec_fields(request),
        ResourceAnnotationKey => fields::annotation_keys(request),

        ResourceSpecFieldValue => values::spec_field_values(request),
        ResourceAnnotationValue => values::annotation_values(request),
        LinkSelectorExcludeValue | DependsOnValue => values::other_resource_names(request),
        DataSourceFilterField => values::filter_fields(request),
        DataSourceFilterOperator => values::filter_operators(request),
        DataSourceExportAliasFor => values::export_alias_targets(request),
        VariableDefaultValue => values::variable_defaults(request),
        ExportFieldValue => match &request.cursor.substitution {
            Some(substitution) => substitutions::complete(request, substitution, substitution.kind()),
            None => Vec::new(),
        },

        SubstitutionGeneric
        | SubstitutionVariableRef
        | SubstitutionResourceRef
        | SubstitutionResourceProperty
        | SubstitutionDataSourceRef
        | SubstitutionDataSourceProperty
        | SubstitutionValueRef
        | SubstitutionValueProperty
        | SubstitutionChildRef
        | SubstitutionChildProperty => match &request.cursor.substitution {
            Some(substitution) => substitutions::complete(request, substitution, request.cursor.kind),
            None => Vec::new(),
        },

        Unknown => Vec::new(),
    }
}

/// Filter by the typed word and replace it with each candidate's insert text.
fn finalize_plain(
    candidates: Vec<CompletionCandidate>,
    cursor: &CursorContext,
    position: Position,
) -> Vec<CompletionCandidate> {
    let prefix = &cursor.prefix;
    let range = Range::new(Position::new(position.line, prefix.start_column), position);
    candidates
        .into_iter()
        .filter(|item| matches_prefix(item.filter_text.as_deref().unwrap_or(&item.label), &prefix.text))
        .map(|mut item| {
            let new_text = item.insert_text_or_label().to_string();
            item.edit = Some(CandidateEdit { range, new_text });
            item.insert_text = None;
            item
        })
        .collect()
}

/// Keep strategy order in the editor regardless of its own sorting.
fn rank(items: Vec<CompletionCandidate>) -> Vec<CompletionCandidate> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, mut item)| {
            item.sort_text = Some(format!("{idx:04}"));
            item
        })
        .collect()
}
