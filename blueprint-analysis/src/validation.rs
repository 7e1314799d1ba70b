//! Minimal static validation against the registries
//!
//! Checks that every resource and data source has a type the registries know about and
//! that export fields point at declared entities. Problems come back as structured load
//! errors, so they flow through the same diagnostic conversion as loader errors.
//!
//! A registry that fails (deadline, cancellation, provider error) skips the checks that
//! depend on it.

use crate::document::DocumentContext;
use crate::outline::outline;
use crate::registry::{Registries, RegistryError, RequestContext};
use blueprint_model::{
    Blueprint, BlueprintError, ErrorContext, LoadError, Namespace, NodePath,
    ReasonCode, SchemaTree, SourceLocation, SourceRange, SuggestedAction,
};
use std::borrow::Cow;
use tracing::warn;

/// Largest edit distance for a name to count as a likely misspelling.
const MAX_SUGGESTION_DISTANCE: usize = 2;

pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.chars().count();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

pub(crate) fn find_closest<'c>(
    name: &str,
    candidates: impl IntoIterator<Item = &'c str>,
) -> Option<String> {
    candidates
        .into_iter()
        .map(|candidate| (levenshtein(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

/// Positions of declarations, from the loader's ranges or the document outline.
struct Locator<'d> {
    tree: Cow<'d, SchemaTree>,
}

impl<'d> Locator<'d> {
    fn new(document: &'d DocumentContext) -> Self {
        let tree = match &document.tree {
            Some(tree) => Cow::Borrowed(tree),
            None => Cow::Owned(outline(&document.content, document.format)),
        };
        Self { tree }
    }

    /// The first of `paths` present in the tree, else the declared range.
    fn locate(&self, declared: Option<SourceRange>, paths: &[NodePath]) -> SourceLocation {
        paths
            .iter()
            .find_map(|path| self.tree.find(path))
            .map(|node| node.range)
            .or(declared)
            .map(SourceLocation::from)
            .unwrap_or_default()
    }
}

fn entity_paths(section: &str, name: &str, field: &str) -> [NodePath; 2] {
    let entity = NodePath::from_segments([section, name]);
    [entity.child(field), entity]
}

/// Known types of one registry, or `None` when the registry could not answer.
fn known_types(what: &str, listed: Result<Vec<String>, RegistryError>) -> Option<Vec<String>> {
    match listed {
        Ok(types) => Some(types),
        Err(err) => {
            warn!(error = %err, "skipping {what} validation");
            None
        }
    }
}

fn unknown_type_error(
    reason: ReasonCode,
    kind: &str,
    name: &str,
    type_name: &str,
    known: &[String],
    location: SourceLocation,
) -> BlueprintError {
    let mut suggested_actions = vec![SuggestedAction {
        title: format!("Check the {} type", kind.to_lowercase()),
        description: Some(format!(
            "\"{type_name}\" is not provided by any installed plugin."
        )),
    }];
    suggested_actions.push(SuggestedAction {
        title: "Install the provider plugin".to_string(),
        description: Some(format!(
            "Install the plugin that provides \"{type_name}\" and reload the workspace."
        )),
    });
    let context = ErrorContext {
        suggestions: find_closest(type_name, known.iter().map(String::as_str))
            .into_iter()
            .collect(),
        available_fields: known.to_vec(),
        suggested_actions,
    };
    LoadError::new(
        reason,
        format!("{kind} \"{name}\" has an unknown type \"{type_name}\""),
    )
    .at(location)
    .with_context(context)
    .into()
}

fn missing_type_error(kind: &str, name: &str, location: SourceLocation) -> BlueprintError {
    LoadError::new(
        ReasonCode::MissingType,
        format!("{kind} \"{name}\" is missing a type"),
    )
    .at(location)
    .into()
}

fn validate_resources(
    ctx: &RequestContext,
    blueprint: &Blueprint,
    registries: &Registries,
    locator: &Locator<'_>,
    errors: &mut Vec<BlueprintError>,
) {
    let mut known: Option<Option<Vec<String>>> = None;
    for (name, resource) in &blueprint.resources {
        let location = locator.locate(resource.range, &entity_paths("resources", name, "type"));
        let Some(resource_type) = resource.resource_type.as_deref() else {
            errors.push(missing_type_error("Resource", name, location));
            continue;
        };
        let types = known.get_or_insert_with(|| {
            known_types("resource type", registries.resources.list_resource_types(ctx))
        });
        let Some(types) = types else {
            continue;
        };
        if !types.iter().any(|candidate| candidate == resource_type) {
            errors.push(unknown_type_error(
                ReasonCode::InvalidResource,
                "Resource",
                name,
                resource_type,
                types,
                location,
            ));
        }
    }
}

fn validate_data_sources(
    ctx: &RequestContext,
    blueprint: &Blueprint,
    registries: &Registries,
    locator: &Locator<'_>,
    errors: &mut Vec<BlueprintError>,
) {
    let mut known: Option<Option<Vec<String>>> = None;
    for (name, data_source) in &blueprint.data_sources {
        let location =
            locator.locate(data_source.range, &entity_paths("datasources", name, "type"));
        let Some(data_source_type) = data_source.data_source_type.as_deref() else {
            errors.push(missing_type_error("Data source", name, location));
            continue;
        };
        let types = known.get_or_insert_with(|| {
            known_types(
                "data source type",
                registries.data_sources.list_data_source_types(ctx),
            )
        });
        let Some(types) = types else {
            continue;
        };
        if !types.iter().any(|candidate| candidate == data_source_type) {
            errors.push(unknown_type_error(
                ReasonCode::InvalidDataSource,
                "Data source",
                name,
                data_source_type,
                types,
                location,
            ));
        }
    }
}

fn validate_exports(blueprint: &Blueprint, locator: &Locator<'_>, errors: &mut Vec<BlueprintError>) {
    for (name, export) in &blueprint.exports {
        let mut segments = export.field.trim().split(['.', '[']);
        let (Some(prefix), Some(entity)) = (segments.next(), segments.next()) else {
            continue;
        };
        let Some(namespace) = Namespace::from_prefix(prefix) else {
            continue;
        };
        let declared = blueprint.names_in(namespace);
        if entity.is_empty() || declared.contains(&entity) {
            continue;
        }
        let location = locator.locate(export.range, &entity_paths("exports", name, "field"));
        let context = ErrorContext {
            suggestions: find_closest(entity, declared.iter().copied())
                .into_iter()
                .collect(),
            available_fields: declared.iter().map(|name| name.to_string()).collect(),
            suggested_actions: Vec::new(),
        };
        errors.push(
            LoadError::new(
                ReasonCode::InvalidReference,
                format!(
                    "export \"{name}\" references {prefix}.{entity}, which is not declared in {}",
                    namespace.section()
                ),
            )
            .at(location)
            .with_context(context)
            .into(),
        );
    }
}

/// Validate the loaded blueprint of `document`. Several problems are wrapped in one
/// error with a child per problem.
pub fn validate_blueprint(
    ctx: &RequestContext,
    document: &DocumentContext,
    registries: &Registries,
) -> Option<BlueprintError> {
    let blueprint = document.blueprint.as_ref()?;
    let locator = Locator::new(document);
    let mut errors = Vec::new();

    validate_resources(ctx, blueprint, registries, &locator, &mut errors);
    validate_data_sources(ctx, blueprint, registries, &locator, &mut errors);
    validate_exports(blueprint, &locator, &mut errors);

    match errors.len() {
        0 => None,
        1 => errors.pop(),
        count => Some(
            LoadError::new(
                ReasonCode::MultipleValidationErrors,
                format!("blueprint has {count} validation errors"),
            )
            .with_children(errors)
            .into(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{collect_diagnostics, DiagnosticOptions};
    use crate::test_support::{document, sample_registries, SAMPLE_YAML};
    use blueprint_model::DocumentFormat;
    use lsp_types::Position;

    fn validate(source: &str) -> Option<BlueprintError> {
        validate_blueprint(
            &RequestContext::background(),
            &document(source, DocumentFormat::Yaml),
            &sample_registries(),
        )
    }

    #[test]
    fn edit_distance() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("caf\u{e9}", "cafe"), 1);
    }

    #[test]
    fn closest_names_within_two_edits() {
        let candidates = ["aws/lambda/function", "aws/dynamodb/table"];
        assert_eq!(
            find_closest("aws/lambda/functon", candidates),
            Some("aws/lambda/function".to_string())
        );
        assert_eq!(find_closest("gcp/bucket", candidates), None);
    }

    #[test]
    fn the_sample_blueprint_is_valid() {
        assert_eq!(validate(SAMPLE_YAML), None);
    }

    #[test]
    fn unknown_resource_types_suggest_close_matches() {
        let error = validate("resources:\n  handler:\n    type: aws/lambda/functon\n").expect("error");
        let BlueprintError::Load(load) = &error else {
            panic!("expected a load error, got {error:?}");
        };
        assert_eq!(load.reason, ReasonCode::InvalidResource);
        let context = load.context.as_ref().unwrap();
        assert_eq!(context.suggestions, vec!["aws/lambda/function".to_string()]);
        assert!(context.available_fields.contains(&"aws/dynamodb/table".to_string()));

        let diagnostics = collect_diagnostics(&error, &DiagnosticOptions::default());
        assert_eq!(diagnostics[0].range.start, Position::new(2, 10));
        assert!(diagnostics[0].message.contains("Did you mean: aws/lambda/function?"));
    }

    #[test]
    fn compact_json_problems_point_at_their_fields() {
        let error = validate_blueprint(
            &RequestContext::background(),
            &document(
                "{\n  \"resources\": {\n    \"handler\": { \"type\": \"aws/lambda/functon\" },\n    // no type yet\n    \"queue\": {}\n  }\n}\n",
                DocumentFormat::Jsonc,
            ),
            &sample_registries(),
        )
        .expect("error");

        let diagnostics = collect_diagnostics(&error, &DiagnosticOptions::default());
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].range.start, Position::new(2, 25));
        assert_eq!(diagnostics[1].range.start, Position::new(4, 4));
    }

    #[test]
    fn several_problems_are_grouped() {
        let error = validate(
            "resources:\n  handler:\n    description: no type\ndatasources:\n  network:\n    type: aws/vcp\nexports:\n  id:\n    type: string\n    field: resources.handlr.spec.id\n",
        )
        .expect("error");
        let BlueprintError::Load(load) = &error else {
            panic!("expected a load error");
        };
        assert_eq!(load.reason, ReasonCode::MultipleValidationErrors);
        let reasons: Vec<_> = load
            .child_errors
            .iter()
            .filter_map(|child| match child {
                BlueprintError::Load(child) => Some(child.reason.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                ReasonCode::MissingType,
                ReasonCode::InvalidDataSource,
                ReasonCode::InvalidReference
            ]
        );

        let diagnostics = collect_diagnostics(&error, &DiagnosticOptions::default());
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[0].range.start, Position::new(1, 2));
        assert!(diagnostics[2].message.contains("Did you mean: handler?"));
    }

    #[test]
    fn failing_registries_skip_their_checks() {
        let ctx = RequestContext::background();
        ctx.cancel();
        let result = validate_blueprint(
            &ctx,
            &document("resources:\n  handler:\n    type: nope\n", DocumentFormat::Yaml),
            &sample_registries(),
        );
        assert_eq!(result, None);
    }
}
