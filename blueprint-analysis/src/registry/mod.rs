//! Type-provider registries as capability interfaces
//!
//! Resource types, data source types, custom variable types, substitution functions and
//! links between resource types are all supplied by plugins. The analysis layer only sees
//! them through the small traits below; every call is fallible and may be slow, so every
//! call receives the [`RequestContext`] of the editor request that triggered it.

mod memory;

pub use memory::{InMemoryRegistry, CORE_FUNCTIONS};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registry call exceeded the request deadline")]
    DeadlineExceeded,
    #[error("request was cancelled")]
    Cancelled,
    #[error("registry provider failed: {0}")]
    Provider(String),
}

/// Deadline and cancellation state of the editor request a registry call serves.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl RequestContext {
    /// A context without deadline, for work not tied to an editor request.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Fails once the request was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), RegistryError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(RegistryError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(RegistryError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Human-facing documentation for a registered type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDescription {
    pub label: Option<String>,
    pub summary: Option<String>,
    pub markdown: Option<String>,
}

impl TypeDescription {
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSchemaKind {
    String,
    Integer,
    Float,
    Boolean,
    Object(BTreeMap<String, SpecSchema>),
    Map(Box<SpecSchema>),
    Array(Box<SpecSchema>),
    Union(Vec<SpecSchema>),
}

/// Shape of a resource spec or data source export as described by its provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSchema {
    pub kind: SpecSchemaKind,
    pub description: Option<String>,
    pub allowed_values: Vec<String>,
}

impl SpecSchema {
    pub fn new(kind: SpecSchemaKind) -> Self {
        Self {
            kind,
            description: None,
            allowed_values: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(SpecSchemaKind::String)
    }

    pub fn integer() -> Self {
        Self::new(SpecSchemaKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(SpecSchemaKind::Boolean)
    }

    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, SpecSchema)>,
        K: Into<String>,
    {
        Self::new(SpecSchemaKind::Object(
            attributes
                .into_iter()
                .map(|(key, schema)| (key.into(), schema))
                .collect(),
        ))
    }

    pub fn map(values: SpecSchema) -> Self {
        Self::new(SpecSchemaKind::Map(Box::new(values)))
    }

    pub fn array(items: SpecSchema) -> Self {
        Self::new(SpecSchemaKind::Array(Box::new(items)))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_allowed_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Follow `path` through objects, maps and arrays. Map segments accept any key and
    /// array segments must be numeric indices.
    pub fn navigate(&self, path: &[String]) -> Option<&SpecSchema> {
        let Some((segment, rest)) = path.split_first() else {
            return Some(self);
        };
        match &self.kind {
            SpecSchemaKind::Object(attributes) => attributes.get(segment)?.navigate(rest),
            SpecSchemaKind::Map(values) => values.navigate(rest),
            SpecSchemaKind::Array(items) if segment.parse::<usize>().is_ok() => {
                items.navigate(rest)
            }
            SpecSchemaKind::Union(members) => {
                members.iter().find_map(|member| member.navigate(path))
            }
            _ => None,
        }
    }

    /// Attributes of an object schema, or of the first object member of a union.
    pub fn attributes(&self) -> Option<&BTreeMap<String, SpecSchema>> {
        match &self.kind {
            SpecSchemaKind::Object(attributes) => Some(attributes),
            SpecSchemaKind::Union(members) => members.iter().find_map(SpecSchema::attributes),
            _ => None,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind, SpecSchemaKind::Boolean)
    }
}

/// A filterable field of a data source type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterField {
    pub field_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub name: String,
    pub summary: String,
    pub signature: Option<String>,
    pub description: Option<String>,
}

/// Which side of a link an annotation definition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSide {
    A,
    B,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationType {
    String,
    Integer,
    Float,
    Boolean,
}

/// A link-scoped annotation a resource may declare in `metadata.annotations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAnnotationDefinition {
    /// Annotation name, optionally containing one `<placeholder>` span.
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub annotation_type: AnnotationType,
    pub allowed_values: Vec<String>,
    pub default_value: Option<String>,
    pub required: bool,
    pub applies_to: LinkSide,
}

/// A link registered between resource type A and resource type B.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDefinition {
    pub resource_type_a: String,
    pub resource_type_b: String,
    /// Keyed by `resourceType::annotationName`.
    pub annotation_definitions: BTreeMap<String, LinkAnnotationDefinition>,
}

pub trait ResourceRegistry: Send + Sync {
    fn list_resource_types(&self, ctx: &RequestContext) -> Result<Vec<String>, RegistryError>;
    fn has_resource_type(
        &self,
        ctx: &RequestContext,
        resource_type: &str,
    ) -> Result<bool, RegistryError>;
    fn spec_definition(
        &self,
        ctx: &RequestContext,
        resource_type: &str,
    ) -> Result<Option<SpecSchema>, RegistryError>;
    fn type_description(
        &self,
        ctx: &RequestContext,
        resource_type: &str,
    ) -> Result<Option<TypeDescription>, RegistryError>;
}

pub trait DataSourceRegistry: Send + Sync {
    fn list_data_source_types(&self, ctx: &RequestContext) -> Result<Vec<String>, RegistryError>;
    fn has_data_source_type(
        &self,
        ctx: &RequestContext,
        data_source_type: &str,
    ) -> Result<bool, RegistryError>;
    fn filter_fields(
        &self,
        ctx: &RequestContext,
        data_source_type: &str,
    ) -> Result<Option<BTreeMap<String, FilterField>>, RegistryError>;
    fn export_fields(
        &self,
        ctx: &RequestContext,
        data_source_type: &str,
    ) -> Result<Option<BTreeMap<String, SpecSchema>>, RegistryError>;
    fn type_description(
        &self,
        ctx: &RequestContext,
        data_source_type: &str,
    ) -> Result<Option<TypeDescription>, RegistryError>;
}

pub trait VariableTypeRegistry: Send + Sync {
    fn list_variable_types(&self, ctx: &RequestContext) -> Result<Vec<String>, RegistryError>;
    fn type_description(
        &self,
        ctx: &RequestContext,
        variable_type: &str,
    ) -> Result<Option<TypeDescription>, RegistryError>;
}

pub trait FunctionRegistry: Send + Sync {
    fn list_functions(&self, ctx: &RequestContext) -> Result<Vec<String>, RegistryError>;
    fn function_definition(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Option<FunctionDefinition>, RegistryError>;
}

pub trait LinkRegistry: Send + Sync {
    /// The link registered from `resource_type_a` to `resource_type_b`, in that
    /// orientation only.
    fn link(
        &self,
        ctx: &RequestContext,
        resource_type_a: &str,
        resource_type_b: &str,
    ) -> Result<Option<LinkDefinition>, RegistryError>;
}

/// The full set of registries available to the analysis layer.
#[derive(Clone)]
pub struct Registries {
    pub resources: Arc<dyn ResourceRegistry>,
    pub data_sources: Arc<dyn DataSourceRegistry>,
    pub variable_types: Arc<dyn VariableTypeRegistry>,
    pub functions: Arc<dyn FunctionRegistry>,
    pub links: Option<Arc<dyn LinkRegistry>>,
}

impl Registries {
    /// Use one in-memory registry for every capability.
    pub fn from_memory(registry: InMemoryRegistry) -> Self {
        let shared = Arc::new(registry);
        Self {
            resources: shared.clone(),
            data_sources: shared.clone(),
            variable_types: shared.clone(),
            functions: shared.clone(),
            links: Some(shared),
        }
    }

    pub fn without_links(mut self) -> Self {
        self.links = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_spec() -> SpecSchema {
        SpecSchema::object([
            (
                "billingMode",
                SpecSchema::string().with_allowed_values(["PAY_PER_REQUEST", "PROVISIONED"]),
            ),
            (
                "keySchema",
                SpecSchema::array(SpecSchema::object([
                    ("attributeName", SpecSchema::string()),
                    ("keyType", SpecSchema::string()),
                ])),
            ),
            ("tags", SpecSchema::map(SpecSchema::string())),
        ])
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn navigate_follows_objects_arrays_and_maps() {
        let spec = table_spec();
        assert_eq!(
            spec.navigate(&path(&["billingMode"])).unwrap().allowed_values,
            vec!["PAY_PER_REQUEST", "PROVISIONED"]
        );
        assert!(spec.navigate(&path(&["keySchema", "0", "keyType"])).is_some());
        assert!(spec.navigate(&path(&["keySchema", "first"])).is_none());
        assert_eq!(
            spec.navigate(&path(&["tags", "team"])).map(|s| &s.kind),
            Some(&SpecSchemaKind::String)
        );
        assert!(spec.navigate(&path(&["missing"])).is_none());
    }

    #[test]
    fn attributes_look_through_unions() {
        let union = SpecSchema::new(SpecSchemaKind::Union(vec![SpecSchema::string(), table_spec()]));
        let attributes = union.attributes().expect("object member present");
        assert!(attributes.contains_key("billingMode"));
    }

    #[test]
    fn cancelled_context_fails_checks() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.check(), Ok(()));
        ctx.cancel();
        assert_eq!(ctx.check(), Err(RegistryError::Cancelled));
    }

    #[test]
    fn expired_deadline_fails_checks() {
        let ctx = RequestContext::with_timeout(Duration::ZERO);
        assert_eq!(ctx.check(), Err(RegistryError::DeadlineExceeded));
        assert_eq!(RequestContext::background().check(), Ok(()));
    }
}
