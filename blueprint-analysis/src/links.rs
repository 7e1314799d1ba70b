//! Link relationship inference
//!
//! Two resources are linked when the link registry knows a link between their types in
//! either orientation. Which side of the link the current resource plays decides which
//! link annotations it may declare: label selection in the document takes precedence and
//! the registered orientation breaks ties.

use crate::cache::{link_cache_key, LinkDefinitionCache};
use crate::registry::{
    LinkAnnotationDefinition, LinkDefinition, LinkRegistry, LinkSide, RegistryError,
    RequestContext,
};
use blueprint_model::{Blueprint, Resource};
use std::sync::Arc;
use tracing::warn;

/// A resource linked to the one under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedResourceInfo {
    pub name: String,
    pub resource_type: String,
    /// Whether the current resource plays side A of the link.
    pub current_is_a: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedLink {
    pub info: LinkedResourceInfo,
    pub definition: Arc<LinkDefinition>,
}

/// An annotation definition together with the type of the resource on the other side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationDefinitionWithContext {
    pub key: String,
    pub definition: LinkAnnotationDefinition,
    pub other_resource_type: String,
}

/// Check whether `selector_owner` selects `target` through its link selector.
///
/// Any single matching label selects, unless the target's name is excluded.
pub fn selects(selector_owner: &Resource, target_name: &str, target: &Resource) -> bool {
    let Some(selector) = &selector_owner.link_selector else {
        return false;
    };
    if selector.exclude.iter().any(|name| name == target_name) {
        return false;
    }
    let Some(labels) = target.labels() else {
        return false;
    };
    selector
        .by_label
        .iter()
        .any(|(key, value)| labels.get(key) == Some(value))
}

/// Decide which side of the link the current resource plays.
///
/// One-directional selection wins. Mutual or absent selection falls back to the
/// orientation the link was registered in.
pub fn current_is_side_a(current_selects: bool, other_selects: bool, registered_a: bool) -> bool {
    match (current_selects, other_selects) {
        (true, false) => true,
        (false, true) => false,
        _ => registered_a,
    }
}

pub struct LinkInferer<'a> {
    registry: Option<&'a dyn LinkRegistry>,
    cache: &'a LinkDefinitionCache,
}

impl<'a> LinkInferer<'a> {
    pub fn new(registry: Option<&'a dyn LinkRegistry>, cache: &'a LinkDefinitionCache) -> Self {
        Self { registry, cache }
    }

    fn lookup(
        &self,
        registry: &dyn LinkRegistry,
        ctx: &RequestContext,
        type_a: &str,
        type_b: &str,
    ) -> Result<Option<Arc<LinkDefinition>>, RegistryError> {
        let key = link_cache_key(type_a, type_b);
        let cached = self.cache.get_or_try_insert_with(&key, || {
            registry
                .link(ctx, type_a, type_b)
                .map(|link| link.map(Arc::new))
        })?;
        Ok(cached.as_ref().clone())
    }

    /// The link registered between two resource types, trying `current -> other` first.
    /// The flag is true when it was registered with the current type as A.
    fn registered_link(
        &self,
        registry: &dyn LinkRegistry,
        ctx: &RequestContext,
        current_type: &str,
        other_type: &str,
    ) -> Result<Option<(Arc<LinkDefinition>, bool)>, RegistryError> {
        if let Some(link) = self.lookup(registry, ctx, current_type, other_type)? {
            return Ok(Some((link, true)));
        }
        Ok(self
            .lookup(registry, ctx, other_type, current_type)?
            .map(|link| (link, false)))
    }

    /// Every other resource in `blueprint` that has a link with `current_name`.
    ///
    /// Without a link registry, or when the current resource has no type, nothing is
    /// linked. Registry failures drop the affected pair.
    pub fn linked_resources(
        &self,
        ctx: &RequestContext,
        blueprint: &Blueprint,
        current_name: &str,
    ) -> Vec<ResolvedLink> {
        let Some(registry) = self.registry else {
            return Vec::new();
        };
        let Some(current) = blueprint.resource(current_name) else {
            return Vec::new();
        };
        let Some(current_type) = current.resource_type.as_deref() else {
            return Vec::new();
        };

        let mut linked = Vec::new();
        for (other_name, other) in &blueprint.resources {
            if other_name == current_name {
                continue;
            }
            let Some(other_type) = other.resource_type.as_deref() else {
                continue;
            };
            let (definition, registered_a) =
                match self.registered_link(registry, ctx, current_type, other_type) {
                    Ok(Some(found)) => found,
                    Ok(None) => continue,
                    Err(err) => {
                        warn!(%current_type, %other_type, error = %err, "link lookup failed");
                        continue;
                    }
                };
            let current_is_a = current_is_side_a(
                selects(current, other_name, other),
                selects(other, current_name, current),
                registered_a,
            );
            linked.push(ResolvedLink {
                info: LinkedResourceInfo {
                    name: other_name.clone(),
                    resource_type: other_type.to_string(),
                    current_is_a,
                },
                definition,
            });
        }
        linked
    }
}

/// Annotation definitions the current resource may declare, given its links.
pub fn applicable_annotation_definitions(
    current_type: &str,
    links: &[ResolvedLink],
) -> Vec<AnnotationDefinitionWithContext> {
    let mut applicable: Vec<AnnotationDefinitionWithContext> = Vec::new();
    for link in links {
        for (key, definition) in &link.definition.annotation_definitions {
            let applies = match definition.applies_to {
                LinkSide::A => link.info.current_is_a,
                LinkSide::B => !link.info.current_is_a,
                LinkSide::Any => key_resource_type(key) == current_type,
            };
            let duplicate = applicable.iter().any(|existing| {
                existing.key == *key && existing.other_resource_type == link.info.resource_type
            });
            if applies && !duplicate {
                applicable.push(AnnotationDefinitionWithContext {
                    key: key.clone(),
                    definition: definition.clone(),
                    other_resource_type: link.info.resource_type.clone(),
                });
            }
        }
    }
    applicable
}

fn key_resource_type(key: &str) -> &str {
    key.split_once("::").map(|(ty, _)| ty).unwrap_or(key)
}

/// Expand a `<placeholder>` span in an annotation name with each resource name.
/// Names without a placeholder expand to themselves.
pub fn expand_annotation_name(name: &str, resource_names: &[&str]) -> Vec<String> {
    let span = name
        .find('<')
        .and_then(|open| name[open..].find('>').map(|close| (open, open + close + 1)));
    match span {
        Some((open, close)) => resource_names
            .iter()
            .map(|resource| format!("{}{}{}", &name[..open], resource, &name[close..]))
            .collect(),
        None => vec![name.to_string()],
    }
}

/// Concrete annotation keys for every applicable definition, paired with the definition
/// they came from. Placeholders expand to the names of linked resources of the other type.
pub fn annotation_key_candidates<'d>(
    definitions: &'d [AnnotationDefinitionWithContext],
    links: &[ResolvedLink],
) -> Vec<(String, &'d AnnotationDefinitionWithContext)> {
    let mut candidates = Vec::new();
    for definition in definitions {
        let names: Vec<&str> = links
            .iter()
            .filter(|link| link.info.resource_type == definition.other_resource_type)
            .map(|link| link.info.name.as_str())
            .collect();
        for key in expand_annotation_name(&definition.definition.name, &names) {
            if !candidates.iter().any(|(existing, _)| *existing == key) {
                candidates.push((key, definition));
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AnnotationType, InMemoryRegistry};
    use blueprint_model::{LinkSelector, ResourceMetadata};
    use std::collections::BTreeMap;

    const FUNCTION: &str = "aws/lambda/function";
    const TABLE: &str = "aws/dynamodb/table";

    fn resource(resource_type: &str) -> Resource {
        Resource {
            resource_type: Some(resource_type.into()),
            ..Resource::default()
        }
    }

    fn labelled(mut resource: Resource, key: &str, value: &str) -> Resource {
        resource.metadata = Some(ResourceMetadata {
            labels: BTreeMap::from([(key.to_string(), value.to_string())]),
            ..ResourceMetadata::default()
        });
        resource
    }

    fn selecting(mut resource: Resource, key: &str, value: &str) -> Resource {
        resource.link_selector = Some(LinkSelector {
            by_label: BTreeMap::from([(key.to_string(), value.to_string())]),
            exclude: Vec::new(),
        });
        resource
    }

    fn annotation(name: &str, applies_to: LinkSide) -> LinkAnnotationDefinition {
        LinkAnnotationDefinition {
            name: name.into(),
            label: None,
            description: None,
            annotation_type: AnnotationType::String,
            allowed_values: Vec::new(),
            default_value: None,
            required: false,
            applies_to,
        }
    }

    fn function_table_link() -> LinkDefinition {
        LinkDefinition {
            resource_type_a: FUNCTION.into(),
            resource_type_b: TABLE.into(),
            annotation_definitions: BTreeMap::from([
                (
                    format!("{FUNCTION}::aws.lambda.dynamodb.<dynamoDBTable>.accessType"),
                    annotation("aws.lambda.dynamodb.<dynamoDBTable>.accessType", LinkSide::A),
                ),
                (
                    format!("{TABLE}::aws.dynamodb.lambda.streamBatchSize"),
                    annotation("aws.dynamodb.lambda.streamBatchSize", LinkSide::B),
                ),
            ]),
        }
    }

    fn blueprint(resources: Vec<(&str, Resource)>) -> Blueprint {
        let mut blueprint = Blueprint::default();
        for (name, resource) in resources {
            blueprint.resources.insert(name.into(), resource);
        }
        blueprint
    }

    #[test]
    fn one_directional_selection_decides_side() {
        assert!(current_is_side_a(true, false, false));
        assert!(!current_is_side_a(false, true, true));
        assert!(current_is_side_a(true, true, true));
        assert!(!current_is_side_a(false, false, false));
    }

    #[test]
    fn exclusions_override_label_matches() {
        let owner = selecting(resource(FUNCTION), "app", "orders");
        let target = labelled(resource(TABLE), "app", "orders");
        assert!(selects(&owner, "ordersTable", &target));

        let mut excluding = owner.clone();
        if let Some(selector) = excluding.link_selector.as_mut() {
            selector.exclude.push("ordersTable".into());
        }
        assert!(!selects(&excluding, "ordersTable", &target));
    }

    #[test]
    fn finds_links_in_reverse_orientation() {
        let registry = InMemoryRegistry::new().with_link(function_table_link());
        let cache = LinkDefinitionCache::new();
        let inferer = LinkInferer::new(Some(&registry as &dyn LinkRegistry), &cache);
        let blueprint = blueprint(vec![
            ("ordersTable", labelled(resource(TABLE), "app", "orders")),
            ("saveOrder", selecting(resource(FUNCTION), "app", "orders")),
        ]);

        let links = inferer.linked_resources(&RequestContext::background(), &blueprint, "ordersTable");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].info.name, "saveOrder");
        assert!(!links[0].info.current_is_a);

        let definitions = applicable_annotation_definitions(TABLE, &links);
        let names: Vec<&str> = definitions.iter().map(|d| d.definition.name.as_str()).collect();
        assert_eq!(names, vec!["aws.dynamodb.lambda.streamBatchSize"]);
    }

    #[test]
    fn side_a_gets_expanded_placeholder_annotations() {
        let registry = InMemoryRegistry::new().with_link(function_table_link());
        let cache = LinkDefinitionCache::new();
        let inferer = LinkInferer::new(Some(&registry as &dyn LinkRegistry), &cache);
        let blueprint = blueprint(vec![
            ("ordersTable", labelled(resource(TABLE), "app", "orders")),
            ("usersTable", labelled(resource(TABLE), "app", "orders")),
            ("saveOrder", selecting(resource(FUNCTION), "app", "orders")),
        ]);

        let links = inferer.linked_resources(&RequestContext::background(), &blueprint, "saveOrder");
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|link| link.info.current_is_a));

        let definitions = applicable_annotation_definitions(FUNCTION, &links);
        assert_eq!(definitions.len(), 1);
        let keys: Vec<String> = annotation_key_candidates(&definitions, &links)
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(
            keys,
            vec![
                "aws.lambda.dynamodb.ordersTable.accessType",
                "aws.lambda.dynamodb.usersTable.accessType",
            ]
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn no_registry_means_no_links() {
        let cache = LinkDefinitionCache::new();
        let inferer = LinkInferer::new(None, &cache);
        let blueprint = blueprint(vec![
            ("a", resource(FUNCTION)),
            ("b", resource(TABLE)),
        ]);
        assert!(inferer
            .linked_resources(&RequestContext::background(), &blueprint, "a")
            .is_empty());
    }

    #[test]
    fn same_type_links_use_key_type() {
        let link = LinkDefinition {
            resource_type_a: FUNCTION.into(),
            resource_type_b: FUNCTION.into(),
            annotation_definitions: BTreeMap::from([(
                format!("{FUNCTION}::aws.lambda.invoke"),
                annotation("aws.lambda.invoke", LinkSide::Any),
            )]),
        };
        let links = vec![ResolvedLink {
            info: LinkedResourceInfo {
                name: "other".into(),
                resource_type: FUNCTION.into(),
                current_is_a: false,
            },
            definition: Arc::new(link),
        }];
        assert_eq!(applicable_annotation_definitions(FUNCTION, &links).len(), 1);
        assert!(applicable_annotation_definitions(TABLE, &links).is_empty());
    }

    #[test]
    fn placeholders_expand_per_name() {
        assert_eq!(
            expand_annotation_name("a.<table>.b", &["x", "y"]),
            vec!["a.x.b", "a.y.b"]
        );
        assert!(expand_annotation_name("a.<table>.b", &[]).is_empty());
        assert_eq!(expand_annotation_name("plain", &["x"]), vec!["plain"]);
    }
}
