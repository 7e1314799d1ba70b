//! Go to definition
//!
//! The cursor is matched against the nodes covering it, innermost first. A reference
//! node links to the declaration it names. Failing that, the innermost plain string is
//! tried against the few fields whose values name something:
//!
//! - an export's `field` (`resources.orders.spec.arn` links to `/resources/orders`)
//! - entries of `dependsOn` and `linkSelector.exclude` (resource names)
//! - an include's `path` (the included file, when it exists)
//!
//! Documents loaded without a schema tree are outlined from their text first.

use crate::document::DocumentContext;
use crate::includes::resolve_include_path;
use crate::outline::outline;
use crate::position::to_protocol_range;
use blueprint_model::{
    Include, Namespace, NodeKind, NodePath, ReferenceTarget, SchemaNode, SchemaTree,
    SourcePosition,
};
use lsp_types::{Position, Range, Url};
use std::borrow::Cow;
use tracing::debug;

/// Where a definition request lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionLink {
    /// The span the cursor was on.
    pub origin: Range,
    pub target_uri: Url,
    pub target_range: Range,
}

pub fn find_definition(
    document: &DocumentContext,
    pos: SourcePosition,
    leeway: usize,
) -> Option<DefinitionLink> {
    let tree = match &document.tree {
        Some(tree) => Cow::Borrowed(tree),
        None => Cow::Owned(outline(&document.content, document.format)),
    };

    let covering = tree.nodes_covering(pos, leeway);
    let reference = covering.iter().rev().find_map(|node| match &node.kind {
        NodeKind::Reference(target) => Some((*node, target)),
        _ => None,
    });
    if let Some((node, target)) = reference {
        return declaration_link(document, &tree, node, target.declaration_path());
    }

    let (node, value) = covering.iter().rev().find_map(|node| match &node.kind {
        NodeKind::String(value) => Some((*node, value)),
        _ => None,
    })?;
    match node.path.segments() {
        [section, _, field] if section == "exports" && field == "field" => {
            let target = export_field_target(value)?;
            declaration_link(document, &tree, node, target.declaration_path())
        }
        [section, _, list, _] if section == "resources" && list == "dependsOn" => {
            resource_link(document, &tree, node, value)
        }
        [section, _, selector, list, _]
            if section == "resources" && selector == "linkSelector" && list == "exclude" =>
        {
            resource_link(document, &tree, node, value)
        }
        [section, name, field] if section == "include" && field == "path" => {
            include_link(document, node, name, value)
        }
        _ => None,
    }
}

/// `resources.orders.spec.arn` names the resource `orders`.
fn export_field_target(field: &str) -> Option<ReferenceTarget> {
    let mut segments = field.trim().split(['.', '[']);
    let namespace = Namespace::from_prefix(segments.next()?)?;
    let name = segments.next().filter(|name| !name.is_empty())?;
    Some(ReferenceTarget::new(namespace, name))
}

fn resource_link(
    document: &DocumentContext,
    tree: &SchemaTree,
    node: &SchemaNode,
    name: &str,
) -> Option<DefinitionLink> {
    let target = ReferenceTarget::Resource(name.trim().to_string());
    declaration_link(document, tree, node, target.declaration_path())
}

fn declaration_link(
    document: &DocumentContext,
    tree: &SchemaTree,
    origin: &SchemaNode,
    path: NodePath,
) -> Option<DefinitionLink> {
    let Some(declaration) = tree.find(&path) else {
        debug!(%path, "definition target not declared");
        return None;
    };
    Some(DefinitionLink {
        origin: to_protocol_range(&origin.range),
        target_uri: document.uri.clone(),
        target_range: to_protocol_range(&declaration.range),
    })
}

fn include_link(
    document: &DocumentContext,
    origin: &SchemaNode,
    name: &str,
    path: &str,
) -> Option<DefinitionLink> {
    let include = document
        .blueprint
        .as_ref()
        .and_then(|blueprint| blueprint.include.get(name))
        .cloned()
        .unwrap_or_else(|| Include {
            path: path.to_string(),
            ..Include::default()
        });
    let file = resolve_include_path(&document.uri, &include)?;
    if !file.is_file() {
        debug!(path = %file.display(), "included blueprint does not exist");
        return None;
    }
    let start = Position::new(0, 0);
    Some(DefinitionLink {
        origin: to_protocol_range(&origin.range),
        target_uri: Url::from_file_path(&file).ok()?,
        target_range: Range::new(start, start),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{document, document_at, sample_with, with_cursor, SAMPLE_YAML};
    use blueprint_model::{DocumentFormat, SourceRange};

    const LEEWAY: usize = 2;

    fn at(source: &str) -> Option<DefinitionLink> {
        let (content, position) = with_cursor(source);
        find_definition(&document(&content, DocumentFormat::Yaml), position, LEEWAY)
    }

    fn range(start: (u32, u32), end: (u32, u32)) -> Range {
        Range::new(Position::new(start.0, start.1), Position::new(end.0, end.1))
    }

    #[test]
    fn substitution_references_link_to_declarations() {
        let link = at(&sample_with(
            "  check:\n    value: ${resources.orders|Table.spec.tableName}\n",
        ))
        .expect("definition");
        assert_eq!(link.origin, range((47, 13), (47, 34)));
        assert_eq!(link.target_range.start, Position::new(25, 2));
        assert_eq!(link.target_uri, crate::test_support::sample_uri(DocumentFormat::Yaml));

        let link = at(&sample_with("  check:\n    value: ${variables.re|gion}\n")).unwrap();
        assert_eq!(link.target_range.start, Position::new(2, 2));
    }

    #[test]
    fn export_fields_name_their_entity() {
        let mut source = SAMPLE_YAML.to_string();
        source = source.replace(
            "field: resources.ordersTable.spec.tableName",
            "field: resources.orders|Table.spec.tableName",
        );
        let link = at(&source).expect("definition");
        assert_eq!(link.origin, range((45, 11), (45, 47)));
        assert_eq!(link.target_range.start, Position::new(25, 2));
    }

    #[test]
    fn resource_lists_name_resources() {
        let source = "resources:\n  table:\n    type: aws/dynamodb/table\n  handler:\n    type: aws/lambda/function\n    dependsOn:\n      - ta|ble\n";
        let link = at(source).expect("definition");
        assert_eq!(link.target_range.start, Position::new(1, 2));

        let source = "resources:\n  table:\n    type: aws/dynamodb/table\n  handler:\n    linkSelector:\n      exclude: [queue, ta|ble]\n";
        assert_eq!(
            at(source).map(|link| link.target_range.start),
            Some(Position::new(1, 2))
        );
    }

    #[test]
    fn include_paths_link_to_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("core.blueprint.yml"), "resources: {}\n").unwrap();
        let uri = Url::from_file_path(dir.path().join("app.blueprint.yml")).unwrap();

        let (content, position) = with_cursor("include:\n  core:\n    path: ./co|re.blueprint.yml\n");
        let doc = document_at(uri.clone(), &content, DocumentFormat::Yaml);
        let link = find_definition(&doc, position, LEEWAY).expect("definition");
        assert_eq!(
            link.target_uri,
            Url::from_file_path(dir.path().join("core.blueprint.yml")).unwrap()
        );
        assert_eq!(link.target_range, range((0, 0), (0, 0)));

        let (content, position) = with_cursor("include:\n  core:\n    path: ./mis|sing.yml\n");
        let doc = document_at(uri, &content, DocumentFormat::Yaml);
        assert!(find_definition(&doc, position, LEEWAY).is_none());
    }

    #[test]
    fn misses_are_empty() {
        assert!(at(&sample_with("  check:\n    value: ${variables.miss|ing}\n")).is_none());
        assert!(at("resources:\n  table:\n    type: aws/dyn|amodb/table\n").is_none());
    }

    const COMPACT: &str = r#"{
  "resources": {
    "orders": { "type": "aws/dynamodb/table" },
    "handler": { "type": "aws/lambda/function", "dependsOn": ["orders"] }
  },
  // derived
  "values": { "arn": { "type": "string", "value": "${resources.orders.spec.arn}" } },
  "exports": { "arn": { "type": "string", "field": "resources.orders.spec.arn" } }
}
"#;

    #[test]
    fn compact_json_is_outlined() {
        let compact_at = |from: &str, to: &str| {
            let (content, position) = with_cursor(&COMPACT.replacen(from, to, 1));
            find_definition(&document(&content, DocumentFormat::Jsonc), position, LEEWAY)
        };

        let link = compact_at("${resources.orders", "${resources.ord|ers").expect("substitution");
        assert_eq!(link.origin, range((6, 53), (6, 69)));
        assert_eq!(link.target_range, range((2, 4), (2, 46)));
        assert_eq!(link.target_uri, crate::test_support::sample_uri(DocumentFormat::Jsonc));

        let link = compact_at("\"field\": \"resources.orders", "\"field\": \"resources.ord|ers")
            .expect("export field");
        assert_eq!(link.origin, range((7, 51), (7, 78)));
        assert_eq!(link.target_range.start, Position::new(2, 4));

        let link = compact_at("[\"orders\"]", "[\"ord|ers\"]").expect("dependsOn entry");
        assert_eq!(link.target_range.start, Position::new(2, 4));

        assert!(compact_at("\"type\": \"aws/dynamodb", "\"type\": \"aws/dyn|amodb").is_none());
    }

    #[test]
    fn loader_trees_are_used_when_present() {
        let (content, position) = with_cursor("{ \"values\": { \"a\": { \"value\": \"${values.b|}\" } } }");
        let mut doc = document(&content, DocumentFormat::Jsonc);
        assert!(find_definition(&doc, position, LEEWAY).is_none());

        let declaration = SchemaNode::new(
            NodePath::parse("/values/b"),
            NodeKind::Mapping,
            SourceRange::new(SourcePosition::new(2, 3), SourcePosition::new(3, 10)),
        );
        let reference = SchemaNode::new(
            NodePath::parse("/values/a/value"),
            NodeKind::Reference(ReferenceTarget::Value("b".into())),
            SourceRange::new(SourcePosition::new(1, 34), SourcePosition::new(1, 42)),
        );
        let values = SchemaNode::new(
            NodePath::parse("/values"),
            NodeKind::Mapping,
            SourceRange::new(SourcePosition::new(1, 1), SourcePosition::new(3, 10)),
        )
        .with_children(vec![declaration, reference]);
        let root = SchemaNode::new(
            NodePath::root(),
            NodeKind::Mapping,
            SourceRange::new(SourcePosition::new(1, 1), SourcePosition::new(3, 10)),
        )
        .with_children(vec![values]);
        doc.tree = Some(SchemaTree::new(root));

        let link = find_definition(&doc, position, LEEWAY).expect("definition");
        assert_eq!(link.origin, range((0, 33), (0, 41)));
        assert_eq!(link.target_range, range((1, 2), (2, 9)));
    }
}
