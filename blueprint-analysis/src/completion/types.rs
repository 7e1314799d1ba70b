//! Type names: registry-provided resource, data source and variable types, and the core
//! types of values and exports.

use super::{CompletionCandidate, Request};
use crate::fields::CORE_VARIABLE_TYPES;
use crate::resolve::ResolveData;
use lsp_types::CompletionItemKind;

pub(super) fn resource_types(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let types = request.registry(
        "resource types",
        request.registries.resources.list_resource_types(request.ctx),
    );
    types
        .into_iter()
        .map(|resource_type| {
            CompletionCandidate::new(resource_type.clone(), CompletionItemKind::CLASS)
                .with_detail("Resource type")
                .with_insert_text(request.value_text(&resource_type))
                .with_resolve(ResolveData::ResourceType { resource_type })
        })
        .collect()
}

pub(super) fn data_source_types(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let types = request.registry(
        "data source types",
        request
            .registries
            .data_sources
            .list_data_source_types(request.ctx),
    );
    types
        .into_iter()
        .map(|data_source_type| {
            CompletionCandidate::new(data_source_type.clone(), CompletionItemKind::CLASS)
                .with_detail("Data source type")
                .with_insert_text(request.value_text(&data_source_type))
                .with_resolve(ResolveData::DataSourceType { data_source_type })
        })
        .collect()
}

/// Core variable types followed by custom types from plugins.
pub(super) fn variable_types(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let mut candidates = core_types(request, CORE_VARIABLE_TYPES);
    let custom = request.registry(
        "variable types",
        request
            .registries
            .variable_types
            .list_variable_types(request.ctx),
    );
    for variable_type in custom {
        if CORE_VARIABLE_TYPES.contains(&variable_type.as_str()) {
            continue;
        }
        candidates.push(
            CompletionCandidate::new(variable_type.clone(), CompletionItemKind::CLASS)
                .with_detail("Custom variable type")
                .with_insert_text(request.value_text(&variable_type))
                .with_resolve(ResolveData::VariableType { variable_type }),
        );
    }
    candidates
}

pub(super) fn core_types(request: &Request<'_>, types: &[&str]) -> Vec<CompletionCandidate> {
    types
        .iter()
        .map(|name| {
            CompletionCandidate::new(*name, CompletionItemKind::KEYWORD)
                .with_detail("Core type")
                .with_insert_text(request.value_text(name))
        })
        .collect()
}
