//! Lazy documentation for completion items
//!
//! Type and function documentation can be expensive to fetch, so completion items only
//! carry a [`ResolveData`] tag and the documentation is looked up when the editor asks to
//! resolve the selected item.

use crate::registry::{Registries, RegistryError, RequestContext, TypeDescription};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "completionType", rename_all = "camelCase")]
pub enum ResolveData {
    #[serde(rename_all = "camelCase")]
    ResourceType { resource_type: String },
    #[serde(rename_all = "camelCase")]
    DataSourceType { data_source_type: String },
    #[serde(rename_all = "camelCase")]
    VariableType { variable_type: String },
    #[serde(rename_all = "camelCase")]
    Function { function_name: String },
}

fn render_type_description(description: TypeDescription) -> Option<String> {
    description
        .markdown
        .or(description.summary)
        .or(description.label)
}

/// Markdown documentation for a resolved completion item.
pub fn resolve_documentation(
    ctx: &RequestContext,
    registries: &Registries,
    data: &ResolveData,
) -> Result<Option<String>, RegistryError> {
    let documentation = match data {
        ResolveData::ResourceType { resource_type } => registries
            .resources
            .type_description(ctx, resource_type)?
            .and_then(render_type_description),
        ResolveData::DataSourceType { data_source_type } => registries
            .data_sources
            .type_description(ctx, data_source_type)?
            .and_then(render_type_description),
        ResolveData::VariableType { variable_type } => registries
            .variable_types
            .type_description(ctx, variable_type)?
            .and_then(render_type_description),
        ResolveData::Function { function_name } => registries
            .functions
            .function_definition(ctx, function_name)?
            .map(|function| {
                let mut sections = Vec::new();
                if let Some(signature) = function.signature {
                    sections.push(format!("```\n{signature}\n```"));
                }
                sections.push(function.description.unwrap_or(function.summary));
                sections.join("\n\n")
            }),
    };
    Ok(documentation)
}
