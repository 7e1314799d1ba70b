//! Blueprint document model
//!
//! The structured view of a blueprint as produced by the loader. Every declared entity
//! carries an optional `range` that the loader fills in when it knows where the entity was
//! declared; the serde-based default loader leaves them empty.

use crate::position::SourceRange;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

/// The parsed document model of a blueprint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub version: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub transform: Vec<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, Variable>,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    #[serde(default)]
    pub include: BTreeMap<String, Include>,
    #[serde(default)]
    pub resources: BTreeMap<String, Resource>,
    #[serde(default, rename = "datasources")]
    pub data_sources: BTreeMap<String, DataSource>,
    #[serde(default)]
    pub exports: BTreeMap<String, Export>,
    pub metadata: Option<serde_json::Value>,
}

impl Blueprint {
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Names declared in the section that `namespace` refers to.
    pub fn names_in(&self, namespace: crate::tree::Namespace) -> Vec<&str> {
        use crate::tree::Namespace;
        match namespace {
            Namespace::Resources => self.resources.keys().map(String::as_str).collect(),
            Namespace::DataSources => self.data_sources.keys().map(String::as_str).collect(),
            Namespace::Variables => self.variables.keys().map(String::as_str).collect(),
            Namespace::Values => self.values.keys().map(String::as_str).collect(),
            Namespace::Children => self.include.keys().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    #[serde(rename = "type")]
    pub var_type: Option<String>,
    pub description: Option<String>,
    pub secret: Option<bool>,
    pub default: Option<ScalarValue>,
    #[serde(default)]
    pub allowed_values: Vec<ScalarValue>,
    #[serde(skip)]
    pub range: Option<SourceRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    #[serde(rename = "type")]
    pub value_type: Option<String>,
    pub value: Option<serde_json::Value>,
    pub description: Option<String>,
    pub secret: Option<bool>,
    #[serde(skip)]
    pub range: Option<SourceRange>,
}

/// A child blueprint include.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Include {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub variables: BTreeMap<String, serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub description: Option<String>,
    #[serde(skip)]
    pub range: Option<SourceRange>,
}

impl Include {
    /// Includes sourced from a remote location never resolve to a local file.
    pub fn is_remote(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.get("sourceType"))
            .and_then(|source| source.as_str())
            .map(|source| !source.eq_ignore_ascii_case("local") && !source.is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<ResourceMetadata>,
    pub condition: Option<serde_json::Value>,
    pub each: Option<String>,
    pub link_selector: Option<LinkSelector>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub depends_on: Vec<String>,
    pub spec: Option<serde_json::Value>,
    #[serde(skip)]
    pub range: Option<SourceRange>,
}

impl Resource {
    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.as_ref().map(|meta| &meta.labels)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub display_name: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, serde_json::Value>,
    pub custom: Option<serde_json::Value>,
}

/// Label-based selection of the resources a resource links to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSelector {
    #[serde(default)]
    pub by_label: BTreeMap<String, String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    #[serde(rename = "type")]
    pub data_source_type: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<DataSourceMetadata>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub filter: Vec<DataSourceFilter>,
    #[serde(default)]
    pub exports: BTreeMap<String, DataSourceFieldExport>,
    #[serde(skip)]
    pub range: Option<SourceRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceMetadata {
    pub display_name: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, serde_json::Value>,
    pub custom: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceFilter {
    pub field: Option<String>,
    pub operator: Option<String>,
    pub search: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceFieldExport {
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub alias_for: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    #[serde(rename = "type")]
    pub export_type: Option<String>,
    #[serde(default)]
    pub field: String,
    pub description: Option<String>,
    #[serde(skip)]
    pub range: Option<SourceRange>,
}

/// Scalar literal as it may appear in variable defaults and allowed value lists.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(value) => write!(f, "{value}"),
            ScalarValue::Int(value) => write!(f, "{value}"),
            ScalarValue::Float(value) => write!(f, "{value}"),
            ScalarValue::String(value) => f.write_str(value),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Several blueprint fields accept either a single entry or a list of entries.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<OneOrMany<T>> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Many(items)) => items,
        None => Vec::new(),
    })
}
