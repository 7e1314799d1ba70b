//! Values of known fields.

use super::{CompletionCandidate, Request, TypeLookup};
use crate::context::{CompletionContextKind, CursorSlot};
use crate::fields::DATA_SOURCE_FILTER_OPERATORS;
use crate::links::{annotation_key_candidates, applicable_annotation_definitions, LinkInferer};
use crate::registry::{AnnotationType, SpecSchema};
use blueprint_model::ScalarValue;
use lsp_types::CompletionItemKind;

const BOOLEANS: [&str; 2] = ["true", "false"];

fn boolean_candidates(request: &Request<'_>) -> Vec<CompletionCandidate> {
    BOOLEANS
        .iter()
        .map(|literal| {
            CompletionCandidate::new(*literal, CompletionItemKind::VALUE)
                .with_insert_text(request.literal_text(literal))
        })
        .collect()
}

fn enum_candidates<'v>(
    request: &Request<'_>,
    values: impl IntoIterator<Item = &'v String>,
    detail: &str,
) -> Vec<CompletionCandidate> {
    values
        .into_iter()
        .map(|value| {
            CompletionCandidate::new(value.clone(), CompletionItemKind::ENUM_MEMBER)
                .with_detail(detail)
                .with_insert_text(request.value_text(value))
        })
        .collect()
}

fn schema_value_candidates(request: &Request<'_>, schema: &SpecSchema) -> Vec<CompletionCandidate> {
    if !schema.allowed_values.is_empty() {
        return enum_candidates(request, &schema.allowed_values, "Allowed value");
    }
    if schema.is_boolean() {
        return boolean_candidates(request);
    }
    Vec::new()
}

pub(super) fn spec_field_values(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let Some(name) = request.cursor.entity_name() else {
        return Vec::new();
    };
    match request.resource_spec(name) {
        TypeLookup::Found(schema) => schema
            .navigate(&request.cursor.path_after("spec"))
            .map(|field| schema_value_candidates(request, field))
            .unwrap_or_default(),
        TypeLookup::Unknown(resource_type) => vec![request.not_found_hint("Resource", &resource_type)],
        TypeLookup::Untyped => Vec::new(),
    }
}

/// Allowed values of the link annotation whose key is being given a value.
pub(super) fn annotation_values(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let CursorSlot::Value { key } = &request.cursor.slot else {
        return Vec::new();
    };
    let (Some(blueprint), Some(name)) = (request.blueprint(), request.cursor.entity_name()) else {
        return Vec::new();
    };
    let Some(current_type) = blueprint
        .resource(name)
        .and_then(|resource| resource.resource_type.as_deref())
    else {
        return Vec::new();
    };

    let inferer = LinkInferer::new(request.registries.links.as_deref(), request.links);
    let links = inferer.linked_resources(request.ctx, blueprint, name);
    let definitions = applicable_annotation_definitions(current_type, &links);
    let Some((_, matched)) = annotation_key_candidates(&definitions, &links)
        .into_iter()
        .find(|(candidate, _)| candidate == key)
    else {
        return Vec::new();
    };

    let definition = &matched.definition;
    if !definition.allowed_values.is_empty() {
        return enum_candidates(request, &definition.allowed_values, "Allowed value");
    }
    if definition.annotation_type == AnnotationType::Boolean {
        return boolean_candidates(request);
    }
    match &definition.default_value {
        Some(default) => enum_candidates(request, [default], "Default value"),
        None => Vec::new(),
    }
}

/// Names of other resources, for `dependsOn` and `linkSelector.exclude` lists.
pub(super) fn other_resource_names(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let Some(blueprint) = request.blueprint() else {
        return Vec::new();
    };
    let current_name = request.cursor.entity_name();
    let current = current_name.and_then(|name| blueprint.resource(name));
    let listed: &[String] = match (request.cursor.kind, current) {
        (CompletionContextKind::DependsOnValue, Some(resource)) => &resource.depends_on,
        (CompletionContextKind::LinkSelectorExcludeValue, Some(resource)) => resource
            .link_selector
            .as_ref()
            .map(|selector| selector.exclude.as_slice())
            .unwrap_or_default(),
        _ => &[],
    };

    blueprint
        .resources
        .iter()
        .filter(|(name, _)| Some(name.as_str()) != current_name && !listed.contains(name))
        .map(|(name, resource)| {
            let mut candidate = CompletionCandidate::new(name.clone(), CompletionItemKind::REFERENCE)
                .with_insert_text(request.value_text(name));
            if let Some(resource_type) = &resource.resource_type {
                candidate = candidate.with_detail(resource_type.clone());
            }
            candidate
        })
        .collect()
}

pub(super) fn filter_fields(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let Some(name) = request.cursor.entity_name() else {
        return Vec::new();
    };
    let data_source_type = match request.data_source_type(name) {
        TypeLookup::Found(data_source_type) => data_source_type,
        TypeLookup::Unknown(data_source_type) => {
            return vec![request.not_found_hint("Data source", &data_source_type)]
        }
        TypeLookup::Untyped => return Vec::new(),
    };
    let fields = request.registry(
        "filter fields",
        request
            .registries
            .data_sources
            .filter_fields(request.ctx, &data_source_type),
    );
    fields
        .unwrap_or_default()
        .into_iter()
        .map(|(field, info)| {
            CompletionCandidate::new(field.clone(), CompletionItemKind::FIELD)
                .with_detail(info.field_type)
                .with_documentation(info.description)
                .with_insert_text(request.value_text(&field))
        })
        .collect()
}

pub(super) fn filter_operators(request: &Request<'_>) -> Vec<CompletionCandidate> {
    DATA_SOURCE_FILTER_OPERATORS
        .iter()
        .map(|operator| {
            CompletionCandidate::new(*operator, CompletionItemKind::OPERATOR)
                .with_detail("Filter operator")
                .with_insert_text(request.value_text(operator))
        })
        .collect()
}

/// Fields of the data source type an export may alias.
pub(super) fn export_alias_targets(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let Some(name) = request.cursor.entity_name() else {
        return Vec::new();
    };
    let data_source_type = match request.data_source_type(name) {
        TypeLookup::Found(data_source_type) => data_source_type,
        TypeLookup::Unknown(data_source_type) => {
            return vec![request.not_found_hint("Data source", &data_source_type)]
        }
        TypeLookup::Untyped => return Vec::new(),
    };
    let fields = request.registry(
        "export fields",
        request
            .registries
            .data_sources
            .export_fields(request.ctx, &data_source_type),
    );
    fields
        .unwrap_or_default()
        .into_iter()
        .map(|(field, schema)| {
            CompletionCandidate::new(field.clone(), CompletionItemKind::FIELD)
                .with_detail("Data source field")
                .with_documentation(schema.description)
                .with_insert_text(request.value_text(&field))
        })
        .collect()
}

/// Allowed values of the variable whose default is being typed.
pub(super) fn variable_defaults(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let Some(variable) = request
        .cursor
        .entity_name()
        .and_then(|name| request.blueprint()?.variables.get(name))
    else {
        return Vec::new();
    };
    if variable.allowed_values.is_empty() {
        return match variable.var_type.as_deref() {
            Some("boolean") => boolean_candidates(request),
            _ => Vec::new(),
        };
    }
    variable
        .allowed_values
        .iter()
        .map(|value| {
            let text = value.to_string();
            let insert = match value {
                ScalarValue::String(_) => request.value_text(&text),
                _ => request.literal_text(&text),
            };
            CompletionCandidate::new(text, CompletionItemKind::ENUM_MEMBER)
                .with_detail("Allowed value")
                .with_insert_text(insert)
        })
        .collect()
}
