//! Schema tree: positioned nodes of a loaded blueprint
//!
//! The loader produces a tree of nodes, each identified by a structural [`NodePath`] such
//! as `/resources/ordersTable/spec/billingMode`. Consumers locate nodes either by path
//! (declaration lookups) or by position (everything covering the cursor).
//!
//! References embedded in substitutions are first-class nodes: [`NodeKind::Reference`]
//! carries a [`ReferenceTarget`], a closed set of the entity kinds a reference can point
//! at. Every consumer matches on it exhaustively.

use crate::position::{SourcePosition, SourceRange};
use std::fmt;

/// Namespaces that substitutions can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Resources,
    DataSources,
    Variables,
    Values,
    Children,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Namespace::Resources,
        Namespace::DataSources,
        Namespace::Variables,
        Namespace::Values,
        Namespace::Children,
    ];

    /// The prefix used inside substitutions, e.g. `resources` in `${resources.orders}`.
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Resources => "resources",
            Namespace::DataSources => "datasources",
            Namespace::Variables => "variables",
            Namespace::Values => "values",
            Namespace::Children => "children",
        }
    }

    /// The top-level blueprint section holding declarations for this namespace.
    pub fn section(self) -> &'static str {
        match self {
            Namespace::Resources => "resources",
            Namespace::DataSources => "datasources",
            Namespace::Variables => "variables",
            Namespace::Values => "values",
            Namespace::Children => "include",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Namespace::ALL
            .into_iter()
            .find(|namespace| namespace.prefix() == prefix)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// The entity a reference node points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceTarget {
    Resource(String),
    DataSource(String),
    Variable(String),
    Value(String),
    Child(String),
}

impl ReferenceTarget {
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        let name = name.into();
        match namespace {
            Namespace::Resources => ReferenceTarget::Resource(name),
            Namespace::DataSources => ReferenceTarget::DataSource(name),
            Namespace::Variables => ReferenceTarget::Variable(name),
            Namespace::Values => ReferenceTarget::Value(name),
            Namespace::Children => ReferenceTarget::Child(name),
        }
    }

    pub fn namespace(&self) -> Namespace {
        match self {
            ReferenceTarget::Resource(_) => Namespace::Resources,
            ReferenceTarget::DataSource(_) => Namespace::DataSources,
            ReferenceTarget::Variable(_) => Namespace::Variables,
            ReferenceTarget::Value(_) => Namespace::Values,
            ReferenceTarget::Child(_) => Namespace::Children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ReferenceTarget::Resource(name)
            | ReferenceTarget::DataSource(name)
            | ReferenceTarget::Variable(name)
            | ReferenceTarget::Value(name)
            | ReferenceTarget::Child(name) => name,
        }
    }

    /// Structural path of the declaration this reference points at.
    pub fn declaration_path(&self) -> NodePath {
        NodePath::from_segments([self.namespace().section(), self.name()])
    }
}

/// Structural path of a node, rendered as `/segment/segment`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a `/a/b/c` path. Empty segments are ignored.
    pub fn parse(path: &str) -> Self {
        Self::from_segments(path.split('/').filter(|segment| !segment.is_empty()))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Mapping,
    Sequence,
    /// A plain string scalar with its unquoted value.
    String(String),
    /// Any other scalar (numbers, booleans, null).
    Scalar,
    /// A string containing one or more `${..}` substitutions.
    Substitution,
    Reference(ReferenceTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    pub path: NodePath,
    pub kind: NodeKind,
    pub range: SourceRange,
    pub children: Vec<SchemaNode>,
}

impl SchemaNode {
    pub fn new(path: NodePath, kind: NodeKind, range: SourceRange) -> Self {
        Self {
            path,
            kind,
            range,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<SchemaNode>) -> Self {
        self.children = children;
        self
    }

    /// Keys of a mapping node's direct children.
    pub fn child_keys(&self) -> Vec<&str> {
        self.children
            .iter()
            .filter_map(|child| child.path.last())
            .collect()
    }
}

/// The positioned tree for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTree {
    pub root: SchemaNode,
}

impl SchemaTree {
    pub fn new(root: SchemaNode) -> Self {
        Self { root }
    }

    /// All nodes whose range covers `pos`, outermost first and innermost last.
    pub fn nodes_covering(&self, pos: SourcePosition, leeway: usize) -> Vec<&SchemaNode> {
        let mut collected = Vec::new();
        collect_covering(&self.root, pos, leeway, &mut collected);
        collected
    }

    pub fn innermost(&self, pos: SourcePosition, leeway: usize) -> Option<&SchemaNode> {
        self.nodes_covering(pos, leeway).pop()
    }

    pub fn find(&self, path: &NodePath) -> Option<&SchemaNode> {
        let mut current = &self.root;
        for depth in 0..path.len() {
            let expected = &path.segments()[..=depth];
            current = current
                .children
                .iter()
                .find(|child| child.path.segments() == expected)?;
        }
        Some(current)
    }
}

fn collect_covering<'a>(
    node: &'a SchemaNode,
    pos: SourcePosition,
    leeway: usize,
    collected: &mut Vec<&'a SchemaNode>,
) {
    if !node.range.contains_with_leeway(pos, leeway) {
        return;
    }
    collected.push(node);
    // Sibling ranges can overlap when leeway is applied; the first match wins.
    if let Some(child) = node
        .children
        .iter()
        .find(|child| child.range.contains_with_leeway(pos, leeway))
    {
        collect_covering(child, pos, leeway, collected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(l1: usize, c1: usize, l2: usize, c2: usize) -> SourceRange {
        SourceRange::new(SourcePosition::new(l1, c1), SourcePosition::new(l2, c2))
    }

    fn sample_tree() -> SchemaTree {
        let reference = SchemaNode::new(
            NodePath::parse("/exports/tableName/field"),
            NodeKind::Reference(ReferenceTarget::Resource("ordersTable".into())),
            range(7, 12, 7, 33),
        );
        let exports = SchemaNode::new(NodePath::parse("/exports"), NodeKind::Mapping, range(5, 1, 7, 40))
            .with_children(vec![SchemaNode::new(
                NodePath::parse("/exports/tableName"),
                NodeKind::Mapping,
                range(6, 3, 7, 40),
            )
            .with_children(vec![reference])]);
        let resources = SchemaNode::new(
            NodePath::parse("/resources"),
            NodeKind::Mapping,
            range(1, 1, 4, 30),
        )
        .with_children(vec![SchemaNode::new(
            NodePath::parse("/resources/ordersTable"),
            NodeKind::Mapping,
            range(2, 3, 4, 30),
        )]);
        SchemaTree::new(
            SchemaNode::new(NodePath::root(), NodeKind::Mapping, range(1, 1, 7, 40))
                .with_children(vec![resources, exports]),
        )
    }

    #[test]
    fn paths_render_and_parse() {
        let path = NodePath::parse("/resources/ordersTable/spec");
        assert_eq!(path.to_string(), "/resources/ordersTable/spec");
        assert_eq!(path.last(), Some("spec"));
        assert_eq!(NodePath::root().to_string(), "/");
        assert_eq!(
            ReferenceTarget::Child("coreInfra".into())
                .declaration_path()
                .to_string(),
            "/include/coreInfra"
        );
    }

    #[test]
    fn nodes_covering_lists_innermost_last() {
        let tree = sample_tree();
        let nodes = tree.nodes_covering(SourcePosition::new(7, 20), 0);
        let paths: Vec<String> = nodes.iter().map(|node| node.path.to_string()).collect();
        assert_eq!(
            paths,
            vec!["/", "/exports", "/exports/tableName", "/exports/tableName/field"]
        );
    }

    #[test]
    fn find_walks_structural_path() {
        let tree = sample_tree();
        let found = tree
            .find(&NodePath::parse("/resources/ordersTable"))
            .expect("declaration present");
        assert_eq!(found.range.start, SourcePosition::new(2, 3));
        assert!(tree.find(&NodePath::parse("/resources/missing")).is_none());
        assert_eq!(tree.find(&NodePath::root()), Some(&tree.root));
    }

    #[test]
    fn namespace_prefixes_round_trip() {
        for namespace in Namespace::ALL {
            assert_eq!(Namespace::from_prefix(namespace.prefix()), Some(namespace));
        }
        assert_eq!(Namespace::from_prefix("include"), None);
    }
}
