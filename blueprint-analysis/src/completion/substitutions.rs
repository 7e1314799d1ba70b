//! References inside `${..}` and in reference-valued fields.
//!
//! Candidates carry only the continuation of the trailing segment as insert text.
//! [`finalize`] turns that into an edit over the whole reference so the editor filters and
//! replaces on the full path.

use super::{CandidateEdit, CompletionCandidate, Request, TypeLookup};
use crate::context::{CompletionContextKind, SubstitutionContext};
use crate::fields::{RESOURCE_METADATA_FIELDS, RESOURCE_PROPERTIES};
use crate::formatter::{format_map_key_access, KeyAccess};
use crate::resolve::ResolveData;
use crate::substitution::ReferencePath;
use blueprint_model::{Blueprint, Namespace};
use lsp_types::{CompletionItemKind, Position, Range};

pub(super) fn complete(
    request: &Request<'_>,
    substitution: &SubstitutionContext,
    kind: CompletionContextKind,
) -> Vec<CompletionCandidate> {
    use CompletionContextKind::*;
    let Some(blueprint) = request.blueprint() else {
        return match kind {
            SubstitutionGeneric => generic(request, None),
            _ => Vec::new(),
        };
    };
    let Some(reference) = &substitution.reference else {
        return generic(request, Some(blueprint));
    };

    match kind {
        SubstitutionResourceRef
        | SubstitutionDataSourceRef
        | SubstitutionValueRef
        | SubstitutionChildRef => entity_names(blueprint, reference),
        SubstitutionVariableRef if reference.entity_name.is_none() => {
            entity_names(blueprint, reference)
        }
        SubstitutionResourceProperty => resource_properties(request, blueprint, reference),
        SubstitutionDataSourceProperty => data_source_exports(blueprint, reference),
        SubstitutionValueProperty => value_keys(blueprint, reference),
        SubstitutionChildProperty => child_exports(request, blueprint, reference),
        _ => Vec::new(),
    }
}

/// Nothing committed yet: namespaces, functions and resource names.
fn generic(request: &Request<'_>, blueprint: Option<&Blueprint>) -> Vec<CompletionCandidate> {
    let mut candidates: Vec<CompletionCandidate> = Namespace::ALL
        .iter()
        .map(|namespace| {
            CompletionCandidate::new(namespace.prefix(), CompletionItemKind::MODULE)
                .with_detail(format!("{} namespace", namespace.section()))
                .with_insert_text(format!("{}.", namespace.prefix()))
        })
        .collect();

    if let Some(blueprint) = blueprint {
        candidates.extend(blueprint.resources.iter().map(|(name, resource)| {
            entity_candidate(name, resource.resource_type.as_deref(), &KeyAccess::default())
        }));
    }

    // Functions cannot appear in export fields.
    if request.cursor.kind != CompletionContextKind::ExportFieldValue {
        let functions = request.registry(
            "functions",
            request.registries.functions.list_functions(request.ctx),
        );
        candidates.extend(functions.into_iter().map(|function_name| {
            CompletionCandidate::new(function_name.clone(), CompletionItemKind::FUNCTION)
                .with_detail("Function")
                .with_insert_text(format!("{function_name}("))
                .with_resolve(ResolveData::Function { function_name })
        }));
    }
    candidates
}

fn entity_candidate(name: &str, detail: Option<&str>, access: &KeyAccess) -> CompletionCandidate {
    let candidate = CompletionCandidate::new(name, CompletionItemKind::VARIABLE)
        .with_insert_text(format_map_key_access(name, access));
    match detail {
        Some(detail) => candidate.with_detail(detail),
        None => candidate,
    }
}

/// Names declared in the reference's namespace.
fn entity_names(blueprint: &Blueprint, reference: &ReferencePath) -> Vec<CompletionCandidate> {
    let access = &reference.access;
    match reference.namespace {
        Namespace::Resources => blueprint
            .resources
            .iter()
            .map(|(name, entity)| entity_candidate(name, entity.resource_type.as_deref(), access))
            .collect(),
        Namespace::DataSources => blueprint
            .data_sources
            .iter()
            .map(|(name, entity)| {
                entity_candidate(name, entity.data_source_type.as_deref(), access)
            })
            .collect(),
        Namespace::Variables => blueprint
            .variables
            .iter()
            .map(|(name, entity)| entity_candidate(name, entity.var_type.as_deref(), access))
            .collect(),
        Namespace::Values => blueprint
            .values
            .iter()
            .map(|(name, entity)| entity_candidate(name, entity.value_type.as_deref(), access))
            .collect(),
        Namespace::Children => blueprint
            .include
            .iter()
            .map(|(name, entity)| entity_candidate(name, Some(entity.path.as_str()), access))
            .collect(),
    }
}

fn property(name: &str, detail: &str, access: &KeyAccess) -> CompletionCandidate {
    CompletionCandidate::new(name, CompletionItemKind::PROPERTY)
        .with_detail(detail)
        .with_insert_text(format_map_key_access(name, access))
}

fn resource_properties(
    request: &Request<'_>,
    blueprint: &Blueprint,
    reference: &ReferencePath,
) -> Vec<CompletionCandidate> {
    let Some(name) = reference.entity_name.as_deref() else {
        return Vec::new();
    };
    let Some(resource) = blueprint.resource(name) else {
        return Vec::new();
    };
    let access = &reference.access;
    let path: Vec<&str> = reference.path.iter().map(String::as_str).collect();

    match path.as_slice() {
        [] => RESOURCE_PROPERTIES
            .iter()
            .map(|field| property(field.name, field.description, access))
            .collect(),
        ["metadata"] => RESOURCE_METADATA_FIELDS
            .iter()
            .map(|field| property(field.name, field.description, access))
            .collect(),
        ["metadata", "labels"] => resource
            .labels()
            .map(|labels| {
                labels
                    .iter()
                    .map(|(key, value)| property(key, value, access))
                    .collect()
            })
            .unwrap_or_default(),
        ["metadata", "annotations"] => resource
            .metadata
            .as_ref()
            .map(|metadata| {
                metadata
                    .annotations
                    .keys()
                    .map(|key| property(key, "Annotation", access))
                    .collect()
            })
            .unwrap_or_default(),
        ["spec", rest @ ..] => {
            let rest: Vec<String> = rest.iter().map(|segment| segment.to_string()).collect();
            match request.resource_spec(name) {
                TypeLookup::Found(schema) => schema
                    .navigate(&rest)
                    .and_then(|node| node.attributes())
                    .map(|attributes| {
                        attributes
                            .iter()
                            .map(|(key, attribute)| {
                                property(key, "Spec field", access)
                                    .with_documentation(attribute.description.clone())
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                TypeLookup::Unknown(resource_type) => {
                    vec![request.not_found_hint("Resource", &resource_type)]
                }
                TypeLookup::Untyped => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

/// Fields the data source exports into the blueprint.
fn data_source_exports(blueprint: &Blueprint, reference: &ReferencePath) -> Vec<CompletionCandidate> {
    if !reference.path.is_empty() {
        return Vec::new();
    }
    let Some(data_source) = reference
        .entity_name
        .as_deref()
        .and_then(|name| blueprint.data_sources.get(name))
    else {
        return Vec::new();
    };
    data_source
        .exports
        .iter()
        .map(|(name, export)| {
            property(
                name,
                export.field_type.as_deref().unwrap_or("Exported field"),
                &reference.access,
            )
            .with_documentation(export.description.clone())
        })
        .collect()
}

/// Keys of the object a value holds at the referenced path.
fn value_keys(blueprint: &Blueprint, reference: &ReferencePath) -> Vec<CompletionCandidate> {
    let Some(mut current) = reference
        .entity_name
        .as_deref()
        .and_then(|name| blueprint.values.get(name))
        .and_then(|value| value.value.as_ref())
    else {
        return Vec::new();
    };
    for segment in &reference.path {
        let next = match current {
            serde_json::Value::Object(map) => map.get(segment),
            serde_json::Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        };
        let Some(next) = next else {
            return Vec::new();
        };
        current = next;
    }
    match current {
        serde_json::Value::Object(map) => map
            .keys()
            .map(|key| property(key, "Value field", &reference.access))
            .collect(),
        _ => Vec::new(),
    }
}

/// Exports of an included child blueprint.
fn child_exports(
    request: &Request<'_>,
    blueprint: &Blueprint,
    reference: &ReferencePath,
) -> Vec<CompletionCandidate> {
    if !reference.path.is_empty() {
        return Vec::new();
    }
    let Some(include) = reference
        .entity_name
        .as_deref()
        .and_then(|name| blueprint.include.get(name))
    else {
        return Vec::new();
    };
    let Some(child) = request.children.resolve(&request.document.uri, include) else {
        return Vec::new();
    };
    child
        .exports
        .iter()
        .map(|(name, export)| {
            property(
                name,
                export.export_type.as_deref().unwrap_or("Child export"),
                &reference.access,
            )
            .with_documentation(export.description.clone())
        })
        .collect()
}

/// Replace the whole reference with the completed path.
pub(super) fn finalize(
    candidates: Vec<CompletionCandidate>,
    substitution: &SubstitutionContext,
    cursor: Position,
) -> Vec<CompletionCandidate> {
    let leading = substitution.inner.chars().count() - substitution.inner.trim_start().chars().count();
    let start = Position::new(cursor.line, substitution.start_column + leading as u32);
    let range = Range::new(start, cursor);
    let committed = substitution
        .reference
        .as_ref()
        .map(|reference| reference.committed.as_str())
        .unwrap_or_default();

    candidates
        .into_iter()
        .map(|mut candidate| {
            let continuation = candidate.insert_text_or_label().to_string();
            let committed = if continuation.starts_with('[') {
                committed.strip_suffix('.').unwrap_or(committed)
            } else {
                committed
            };
            let new_text = format!("{committed}{continuation}");
            candidate.filter_text = Some(new_text.clone());
            candidate.edit = Some(CandidateEdit { range, new_text });
            candidate.insert_text = None;
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substitution(inner: &str, start_column: u32, reference: Option<ReferencePath>) -> SubstitutionContext {
        SubstitutionContext {
            inner: inner.to_string(),
            start_column,
            enclosing_quote: None,
            reference,
        }
    }

    fn reference(committed: &str, filter_prefix: &str) -> ReferencePath {
        ReferencePath {
            namespace: Namespace::Resources,
            entity_name: None,
            path: Vec::new(),
            filter_prefix: filter_prefix.to_string(),
            committed: committed.to_string(),
            access: KeyAccess::default(),
        }
    }

    #[test]
    fn edits_span_the_whole_reference() {
        let context = substitution("resources.ord", 9, Some(reference("resources.", "ord")));
        let candidate = CompletionCandidate::new("orders", CompletionItemKind::VARIABLE)
            .with_insert_text("orders");
        let finalized = finalize(vec![candidate], &context, Position::new(4, 22));
        let edit = finalized[0].edit.clone().unwrap();
        assert_eq!(edit.range, Range::new(Position::new(4, 9), Position::new(4, 22)));
        assert_eq!(edit.new_text, "resources.orders");
        assert_eq!(finalized[0].filter_text.as_deref(), Some("resources.orders"));
        assert_eq!(finalized[0].insert_text, None);
    }

    #[test]
    fn bracket_continuations_replace_the_trailing_dot() {
        let context = substitution("resources.", 2, Some(reference("resources.", "")));
        let candidate = CompletionCandidate::new("my-table", CompletionItemKind::VARIABLE)
            .with_insert_text("[\"my-table\"]");
        let finalized = finalize(vec![candidate], &context, Position::new(0, 12));
        assert_eq!(
            finalized[0].edit.as_ref().unwrap().new_text,
            "resources[\"my-table\"]"
        );
    }

    #[test]
    fn leading_whitespace_is_kept() {
        let context = substitution("  var", 2, None);
        let candidate = CompletionCandidate::new("variables", CompletionItemKind::MODULE)
            .with_insert_text("variables.");
        let finalized = finalize(vec![candidate], &context, Position::new(0, 7));
        let edit = finalized[0].edit.clone().unwrap();
        assert_eq!(edit.range.start, Position::new(0, 4));
        assert_eq!(edit.new_text, "variables.");
    }
}
