//! Fields each blueprint section accepts, with short descriptions for completion items

/// A field name a definition accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: &'static str,
    pub description: &'static str,
}

const fn field(name: &'static str, description: &'static str) -> FieldInfo {
    FieldInfo { name, description }
}

pub const BLUEPRINT_TOP_LEVEL_FIELDS: &[FieldInfo] = &[
    field("version", "The blueprint specification version."),
    field("transform", "Transforms to apply to the blueprint before deployment."),
    field("variables", "Inputs provided when the blueprint is deployed."),
    field("values", "Named values computed from other elements of the blueprint."),
    field("include", "Child blueprints included in this blueprint."),
    field("resources", "Infrastructure resources the blueprint deploys."),
    field("datasources", "External data the blueprint reads at deploy time."),
    field("exports", "Fields exported for other blueprints and tools to consume."),
    field("metadata", "Free-form metadata for the blueprint."),
];

pub const RESOURCE_FIELDS: &[FieldInfo] = &[
    field("type", "The resource type, provided by a plugin."),
    field("description", "A human-readable description of the resource."),
    field("metadata", "Display name, labels, annotations and custom metadata."),
    field("condition", "A condition that decides whether the resource is deployed."),
    field("each", "Deploy one resource per element of a list."),
    field("linkSelector", "Select resources to link to by their labels."),
    field("dependsOn", "Resources that must be deployed before this one."),
    field("spec", "The resource specification defined by its type."),
];

pub const RESOURCE_METADATA_FIELDS: &[FieldInfo] = &[
    field("displayName", "A human-friendly name for the resource."),
    field("labels", "Labels other resources select this resource by."),
    field("annotations", "Annotations that configure links and provider behaviour."),
    field("custom", "Free-form custom metadata."),
];

pub const LINK_SELECTOR_FIELDS: &[FieldInfo] = &[
    field("byLabel", "Labels a resource must carry to be linked."),
    field("exclude", "Names of resources never to link to."),
];

pub const VARIABLE_FIELDS: &[FieldInfo] = &[
    field("type", "The variable type."),
    field("description", "A human-readable description of the variable."),
    field("secret", "Whether the value must be treated as a secret."),
    field("default", "The value used when none is provided."),
    field("allowedValues", "The values the variable may take."),
];

pub const VALUE_FIELDS: &[FieldInfo] = &[
    field("type", "The type of the value."),
    field("value", "The value, which may contain substitutions."),
    field("description", "A human-readable description of the value."),
    field("secret", "Whether the value must be treated as a secret."),
];

pub const DATA_SOURCE_FIELDS: &[FieldInfo] = &[
    field("type", "The data source type, provided by a plugin."),
    field("description", "A human-readable description of the data source."),
    field("metadata", "Display name, annotations and custom metadata."),
    field("filter", "Filters that select the external data to fetch."),
    field("exports", "Fields of the data source made available to the blueprint."),
];

pub const DATA_SOURCE_METADATA_FIELDS: &[FieldInfo] = &[
    field("displayName", "A human-friendly name for the data source."),
    field("annotations", "Annotations that configure provider behaviour."),
    field("custom", "Free-form custom metadata."),
];

pub const DATA_SOURCE_FILTER_FIELDS: &[FieldInfo] = &[
    field("field", "The data source field to filter on."),
    field("operator", "How the field is compared with the search value."),
    field("search", "The value or values to compare against."),
];

pub const DATA_SOURCE_EXPORT_FIELDS: &[FieldInfo] = &[
    field("type", "The type of the exported field."),
    field("aliasFor", "The data source field this export reads from."),
    field("description", "A human-readable description of the export."),
];

pub const INCLUDE_FIELDS: &[FieldInfo] = &[
    field("path", "Path of the child blueprint, relative to this document."),
    field("variables", "Variables passed to the child blueprint."),
    field("metadata", "Metadata such as the source the child blueprint is fetched from."),
    field("description", "A human-readable description of the include."),
];

pub const EXPORT_FIELDS: &[FieldInfo] = &[
    field("type", "The type of the exported value."),
    field("field", "Reference to the exported field, e.g. resources.orders.spec.arn."),
    field("description", "A human-readable description of the export."),
];

/// Operators a data source filter accepts.
pub const DATA_SOURCE_FILTER_OPERATORS: &[&str] = &[
    "=",
    "!=",
    "in",
    "not in",
    "has key",
    "not has key",
    "contains",
    "not contains",
    "starts with",
    "not starts with",
    "ends with",
    "not ends with",
    ">",
    "<",
    ">=",
    "<=",
];

/// Core variable types, before custom types from the registry.
pub const CORE_VARIABLE_TYPES: &[&str] = &["string", "integer", "float", "boolean"];

/// Types a value or export may declare.
pub const VALUE_TYPES: &[&str] = &["string", "integer", "float", "boolean", "array", "object"];

/// Types a data source export may declare.
pub const DATA_SOURCE_EXPORT_TYPES: &[&str] = &["string", "integer", "float", "boolean", "array"];

/// Properties of a resource reachable from a substitution.
pub const RESOURCE_PROPERTIES: &[FieldInfo] = &[
    field("spec", "The resource specification, including computed fields."),
    field("metadata", "The resource metadata."),
];
