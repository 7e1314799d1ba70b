use super::{
    DataSourceRegistry, FilterField, FunctionDefinition, FunctionRegistry, LinkDefinition,
    LinkRegistry, RegistryError, RequestContext, ResourceRegistry, SpecSchema, TypeDescription,
    VariableTypeRegistry,
};
use std::collections::BTreeMap;

/// Functions every blueprint can call inside substitutions, as `(name, summary)`.
pub const CORE_FUNCTIONS: &[(&str, &str)] = &[
    ("fromjson", "Extracts a value from a serialised JSON string."),
    ("jsondecode", "Decodes a serialised JSON string into a value."),
    ("len", "Returns the length of a string, array or mapping."),
    ("substr", "Returns a substring of a string between two indices."),
    ("replace", "Replaces all occurrences of a substring."),
    ("trim", "Removes leading and trailing whitespace."),
    ("trimprefix", "Removes a prefix from a string."),
    ("trimsuffix", "Removes a suffix from a string."),
    ("split", "Splits a string into an array of substrings."),
    ("join", "Joins an array of strings with a delimiter."),
    ("index", "Finds the first index of a substring."),
    ("last_index", "Finds the last index of a substring."),
    ("to_upper", "Converts a string to upper case."),
    ("to_lower", "Converts a string to lower case."),
    ("has_prefix", "Checks whether a string starts with a prefix."),
    ("has_suffix", "Checks whether a string ends with a suffix."),
    ("contains", "Checks whether a string or array contains a value."),
    ("list", "Creates an array from its arguments."),
    ("object", "Creates a mapping from named arguments."),
    ("keys", "Returns the keys of a mapping."),
    ("vals", "Returns the values of a mapping."),
    ("map", "Applies a function to every element of an array."),
    ("filter", "Keeps the array elements a predicate accepts."),
    ("reduce", "Folds an array into a single value."),
    ("sort", "Sorts an array with a comparison function."),
    ("flatmap", "Maps then flattens an array."),
    ("compose", "Composes functions right to left."),
    ("pipe", "Composes functions left to right."),
    ("getattr", "Gets an attribute of a mapping by name."),
    ("getelem", "Gets an element of an array by index."),
    ("link", "Retrieves the state of a link between two resources."),
    ("and", "Logical conjunction."),
    ("or", "Logical disjunction."),
    ("not", "Logical negation."),
    ("eq", "Checks two values for equality."),
    ("gt", "Greater than comparison."),
    ("ge", "Greater than or equal comparison."),
    ("lt", "Less than comparison."),
    ("le", "Less than or equal comparison."),
    ("cwd", "Returns the working directory of the deploy engine."),
    ("datetime", "Returns the current time in a named format."),
];

#[derive(Debug, Clone, Default)]
struct ResourceTypeEntry {
    spec: Option<SpecSchema>,
    description: Option<TypeDescription>,
}

#[derive(Debug, Clone, Default)]
struct DataSourceTypeEntry {
    filter_fields: BTreeMap<String, FilterField>,
    export_fields: BTreeMap<String, SpecSchema>,
    description: Option<TypeDescription>,
}

/// A registry backed by plain maps.
///
/// The binary seeds it with the core function catalogue; tests build it up with the
/// `with_*` builders.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    resource_types: BTreeMap<String, ResourceTypeEntry>,
    data_source_types: BTreeMap<String, DataSourceTypeEntry>,
    variable_types: BTreeMap<String, Option<TypeDescription>>,
    functions: BTreeMap<String, FunctionDefinition>,
    links: BTreeMap<(String, String), LinkDefinition>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_core_functions() -> Self {
        CORE_FUNCTIONS
            .iter()
            .fold(Self::new(), |registry, (name, summary)| {
                registry.with_function(FunctionDefinition {
                    name: (*name).to_string(),
                    summary: (*summary).to_string(),
                    signature: None,
                    description: None,
                })
            })
    }

    pub fn with_resource_type(
        mut self,
        resource_type: impl Into<String>,
        spec: Option<SpecSchema>,
        description: Option<TypeDescription>,
    ) -> Self {
        self.resource_types
            .insert(resource_type.into(), ResourceTypeEntry { spec, description });
        self
    }

    pub fn with_data_source_type<F, E>(
        mut self,
        data_source_type: impl Into<String>,
        filter_fields: F,
        export_fields: E,
        description: Option<TypeDescription>,
    ) -> Self
    where
        F: IntoIterator<Item = (String, FilterField)>,
        E: IntoIterator<Item = (String, SpecSchema)>,
    {
        self.data_source_types.insert(
            data_source_type.into(),
            DataSourceTypeEntry {
                filter_fields: filter_fields.into_iter().collect(),
                export_fields: export_fields.into_iter().collect(),
                description,
            },
        );
        self
    }

    pub fn with_variable_type(
        mut self,
        variable_type: impl Into<String>,
        description: Option<TypeDescription>,
    ) -> Self {
        self.variable_types.insert(variable_type.into(), description);
        self
    }

    pub fn with_function(mut self, function: FunctionDefinition) -> Self {
        self.functions.insert(function.name.clone(), function);
        self
    }

    pub fn with_link(mut self, link: LinkDefinition) -> Self {
        self.links.insert(
            (link.resource_type_a.clone(), link.resource_type_b.clone()),
            link,
        );
        self
    }
}

impl ResourceRegistry for InMemoryRegistry {
    fn list_resource_types(&self, ctx: &RequestContext) -> Result<Vec<String>, RegistryError> {
        ctx.check()?;
        Ok(self.resource_types.keys().cloned().collect())
    }

    fn has_resource_type(
        &self,
        ctx: &RequestContext,
        resource_type: &str,
    ) -> Result<bool, RegistryError> {
        ctx.check()?;
        Ok(self.resource_types.contains_key(resource_type))
    }

    fn spec_definition(
        &self,
        ctx: &RequestContext,
        resource_type: &str,
    ) -> Result<Option<SpecSchema>, RegistryError> {
        ctx.check()?;
        Ok(self
            .resource_types
            .get(resource_type)
            .and_then(|entry| entry.spec.clone()))
    }

    fn type_description(
        &self,
        ctx: &RequestContext,
        resource_type: &str,
    ) -> Result<Option<TypeDescription>, RegistryError> {
        ctx.check()?;
        Ok(self
            .resource_types
            .get(resource_type)
            .and_then(|entry| entry.description.clone()))
    }
}

impl DataSourceRegistry for InMemoryRegistry {
    fn list_data_source_types(&self, ctx: &RequestContext) -> Result<Vec<String>, RegistryError> {
        ctx.check()?;
        Ok(self.data_source_types.keys().cloned().collect())
    }

    fn has_data_source_type(
        &self,
        ctx: &RequestContext,
        data_source_type: &str,
    ) -> Result<bool, RegistryError> {
        ctx.check()?;
        Ok(self.data_source_types.contains_key(data_source_type))
    }

    fn filter_fields(
        &self,
        ctx: &RequestContext,
        data_source_type: &str,
    ) -> Result<Option<BTreeMap<String, FilterField>>, RegistryError> {
        ctx.check()?;
        Ok(self
            .data_source_types
            .get(data_source_type)
            .map(|entry| entry.filter_fields.clone()))
    }

    fn export_fields(
        &self,
        ctx: &RequestContext,
        data_source_type: &str,
    ) -> Result<Option<BTreeMap<String, SpecSchema>>, RegistryError> {
        ctx.check()?;
        Ok(self
            .data_source_types
            .get(data_source_type)
            .map(|entry| entry.export_fields.clone()))
    }

    fn type_description(
        &self,
        ctx: &RequestContext,
        data_source_type: &str,
    ) -> Result<Option<TypeDescription>, RegistryError> {
        ctx.check()?;
        Ok(self
            .data_source_types
            .get(data_source_type)
            .and_then(|entry| entry.description.clone()))
    }
}

impl VariableTypeRegistry for InMemoryRegistry {
    fn list_variable_types(&self, ctx: &RequestContext) -> Result<Vec<String>, RegistryError> {
        ctx.check()?;
        Ok(self.variable_types.keys().cloned().collect())
    }

    fn type_description(
        &self,
        ctx: &RequestContext,
        variable_type: &str,
    ) -> Result<Option<TypeDescription>, RegistryError> {
        ctx.check()?;
        Ok(self.variable_types.get(variable_type).cloned().flatten())
    }
}

impl FunctionRegistry for InMemoryRegistry {
    fn list_functions(&self, ctx: &RequestContext) -> Result<Vec<String>, RegistryError> {
        ctx.check()?;
        Ok(self.functions.keys().cloned().collect())
    }

    fn function_definition(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Option<FunctionDefinition>, RegistryError> {
        ctx.check()?;
        Ok(self.functions.get(name).cloned())
    }
}

impl LinkRegistry for InMemoryRegistry {
    fn link(
        &self,
        ctx: &RequestContext,
        resource_type_a: &str,
        resource_type_b: &str,
    ) -> Result<Option<LinkDefinition>, RegistryError> {
        ctx.check()?;
        Ok(self
            .links
            .get(&(resource_type_a.to_string(), resource_type_b.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_functions_are_listed_in_name_order() {
        let registry = InMemoryRegistry::with_core_functions();
        let ctx = RequestContext::background();
        let functions = registry.list_functions(&ctx).unwrap();
        assert_eq!(functions.len(), CORE_FUNCTIONS.len());
        assert!(functions.windows(2).all(|pair| pair[0] <= pair[1]));
        let len = registry.function_definition(&ctx, "len").unwrap().unwrap();
        assert!(len.summary.contains("length"));
    }

    #[test]
    fn links_are_looked_up_in_registered_orientation_only() {
        let registry = InMemoryRegistry::new().with_link(LinkDefinition {
            resource_type_a: "aws/lambda/function".into(),
            resource_type_b: "aws/dynamodb/table".into(),
            annotation_definitions: BTreeMap::new(),
        });
        let ctx = RequestContext::background();
        assert!(registry
            .link(&ctx, "aws/lambda/function", "aws/dynamodb/table")
            .unwrap()
            .is_some());
        assert!(registry
            .link(&ctx, "aws/dynamodb/table", "aws/lambda/function")
            .unwrap()
            .is_none());
    }

    #[test]
    fn calls_fail_once_the_request_is_cancelled() {
        let registry = InMemoryRegistry::new().with_resource_type("aws/sqs/queue", None, None);
        let ctx = RequestContext::background();
        ctx.cancel();
        assert_eq!(
            registry.list_resource_types(&ctx),
            Err(RegistryError::Cancelled)
        );
    }
}
