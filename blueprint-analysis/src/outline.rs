//! Positioned outlines of document text
//!
//! The default loader hands back the blueprint without positions. When a document has no
//! schema tree, an outline rebuilds one from the text. In the block format mappings and
//! sequences are recovered from indentation and span their lines; in compact JSON objects
//! and arrays span their braces. Scalars become nodes spanning their value text, and every
//! `namespace.name` reference inside a `${..}` becomes a [`NodeKind::Reference`] child of
//! its string.
//!
//! Block flow collections are only followed one level deep (`[a, b]`), and the lines of
//! literal blocks (`|`, `>`) are skipped.

use crate::context::block_entry;
use blueprint_model::{
    DocumentFormat, Namespace, NodeKind, NodePath, ReferenceTarget, SchemaNode, SchemaTree, SourcePosition,
    SourceRange,
};
use once_cell::sync::Lazy;
use regex::Regex;

static SUBSTITUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]*)\}?").expect("substitution regex"));

static NAMESPACED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(resources|datasources|variables|values|children)\.([A-Za-z0-9_-]+)")
        .expect("namespaced reference regex")
});

static LEADING_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_-]*)").expect("leading name regex"));

struct Frame {
    indent: usize,
    is_item: bool,
    items: usize,
    node: SchemaNode,
}

impl Frame {
    fn new(indent: usize, is_item: bool, node: SchemaNode) -> Self {
        Self {
            indent,
            is_item,
            items: 0,
            node,
        }
    }

    fn next_item_path(&mut self) -> NodePath {
        let path = self.node.path.child(self.items.to_string());
        self.items += 1;
        self.node.kind = NodeKind::Sequence;
        path
    }
}

/// Build a schema tree from block-format text.
pub fn block_outline(content: &str) -> SchemaTree {
    let root = SchemaNode::new(
        NodePath::root(),
        NodeKind::Mapping,
        SourceRange::starting_at(SourcePosition::new(1, 1)),
    );
    let mut stack = vec![Frame::new(0, false, root)];
    let mut last_end = SourcePosition::new(1, 1);
    let mut literal_indent: Option<usize> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.chars().count() - trimmed.chars().count();
        let line_end = SourcePosition::new(line_no, line.chars().count() + 1);

        if let Some(block) = literal_indent {
            if indent > block {
                last_end = line_end;
                continue;
            }
            literal_indent = None;
        }

        let is_item = trimmed == "-" || trimmed.starts_with("- ");
        close_frames(&mut stack, indent, is_item, last_end);

        if is_item {
            literal_indent = item_line(&mut stack, line, line_no, indent);
        } else if let Some(entry) = block_entry(line) {
            literal_indent = key_line(&mut stack, line, line_no, entry);
        }
        last_end = line_end;
    }

    close_frames(&mut stack, 0, false, last_end);
    let mut root = match stack.pop() {
        Some(frame) => frame.node,
        None => SchemaNode::new(
            NodePath::root(),
            NodeKind::Mapping,
            SourceRange::starting_at(SourcePosition::new(1, 1)),
        ),
    };
    root.range.end = Some(last_end);
    SchemaTree::new(root)
}

fn close_frames(stack: &mut Vec<Frame>, indent: usize, is_item: bool, end: SourcePosition) {
    while stack.len() > 1 {
        let Some(top) = stack.last() else {
            break;
        };
        let closes = if is_item {
            top.indent > indent || (top.indent == indent && top.is_item)
        } else {
            top.indent >= indent
        };
        if !closes {
            break;
        }
        if let Some(mut frame) = stack.pop() {
            frame.node.range.end = Some(end);
            if let Some(parent) = stack.last_mut() {
                parent.node.children.push(frame.node);
            }
        }
    }
}

fn item_line(stack: &mut Vec<Frame>, line: &str, line_no: usize, indent: usize) -> Option<usize> {
    let path = stack.last_mut()?.next_item_path();
    let start = SourcePosition::new(line_no, indent + 1);

    if let Some(entry) = block_entry(line) {
        let item = SchemaNode::new(path, NodeKind::Mapping, SourceRange::starting_at(start));
        stack.push(Frame::new(indent, true, item));
        return key_line(stack, line, line_no, entry);
    }

    let dash = line.find('-')?;
    let rest = &line[dash + 1..];
    let value_offset = dash + 1 + (rest.len() - rest.trim_start().len());
    let value = value_text(&line[value_offset..]);
    if value.is_empty() {
        let item = SchemaNode::new(path, NodeKind::Mapping, SourceRange::starting_at(start));
        stack.push(Frame::new(indent, true, item));
        return None;
    }
    let column = line[..value_offset].chars().count() + 1;
    let node = value_node(path, value, line_no, column);
    if let Some(parent) = stack.last_mut() {
        parent.node.children.push(node);
    }
    None
}

fn key_line(
    stack: &mut Vec<Frame>,
    line: &str,
    line_no: usize,
    (key_column, key, value_start): (usize, String, usize),
) -> Option<usize> {
    let path = stack.last()?.node.path.child(key);
    let raw = &line[value_start..];
    let value_offset = value_start + (raw.len() - raw.trim_start().len());
    let value = value_text(&line[value_offset..]);

    if value.is_empty() {
        let node = SchemaNode::new(
            path,
            NodeKind::Mapping,
            SourceRange::starting_at(SourcePosition::new(line_no, key_column + 1)),
        );
        stack.push(Frame::new(key_column, false, node));
        return None;
    }

    let column = line[..value_offset].chars().count() + 1;
    let is_literal_block = value.starts_with('|') || value.starts_with('>');
    let node = if is_literal_block {
        scalar_span(path, NodeKind::String(String::new()), line_no, column, value)
    } else {
        value_node(path, value, line_no, column)
    };
    stack.last_mut()?.node.children.push(node);
    is_literal_block.then_some(key_column)
}

/// Outline `content` in the syntax of `format`.
pub fn outline(content: &str, format: DocumentFormat) -> SchemaTree {
    match format {
        DocumentFormat::Yaml => block_outline(content),
        DocumentFormat::Jsonc => jsonc_outline(content),
    }
}

/// Build a schema tree from compact JSON text.
///
/// Collections stored under a key start at that key, like block mappings do. Unterminated
/// collections end where the text ends and characters that fit nowhere are skipped, so a
/// document halfway through an edit still outlines up to the cursor.
pub fn jsonc_outline(content: &str) -> SchemaTree {
    let mut scanner = JsonScanner::new(content);
    scanner.skip_trivia();
    let mut root = match scanner.peek() {
        Some('{') => {
            let start = scanner.position();
            scanner.object(NodePath::root(), start)
        }
        _ => SchemaNode::new(
            NodePath::root(),
            NodeKind::Mapping,
            SourceRange::new(SourcePosition::new(1, 1), scanner.position()),
        ),
    };
    root.range.start = SourcePosition::new(1, 1);
    SchemaTree::new(root)
}

struct JsonScanner {
    chars: Vec<char>,
    idx: usize,
    line: usize,
    column: usize,
}

impl JsonScanner {
    fn new(content: &str) -> Self {
        Self {
            chars: content.chars().collect(),
            idx: 0,
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> SourcePosition {
        SourcePosition::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.get(self.idx + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.idx += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(ch), _) if ch.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    while self.peek().is_some()
                        && !(self.peek() == Some('*') && self.peek_second() == Some('/'))
                    {
                        self.bump();
                    }
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }
    }

    /// Source text of the string literal under the scanner, quotes included. Strings
    /// cannot span lines, so an unterminated one ends with its line.
    fn string(&mut self) -> String {
        let mut raw = String::new();
        let Some(quote) = self.bump() else {
            return raw;
        };
        raw.push(quote);
        while let Some(ch) = self.peek().filter(|ch| *ch != '\n') {
            self.bump();
            raw.push(ch);
            if ch == quote {
                break;
            }
            if ch == '\\' {
                if let Some(escaped) = self.peek().filter(|ch| *ch != '\n') {
                    self.bump();
                    raw.push(escaped);
                }
            }
        }
        raw
    }

    /// Unquoted keys and literals such as numbers, `true` and `null`.
    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(ch) = self
            .peek()
            .filter(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '+' | '.' | '$'))
        {
            self.bump();
            word.push(ch);
        }
        word
    }

    fn value(&mut self, path: NodePath) -> Option<SchemaNode> {
        let start = self.position();
        match self.peek()? {
            '{' => Some(self.object(path, start)),
            '[' => Some(self.array(path, start)),
            '"' | '\'' => {
                let raw = self.string();
                Some(json_string_node(path, &raw, start))
            }
            ',' | '}' | ']' => None,
            _ => {
                if self.word().is_empty() {
                    self.bump();
                    return None;
                }
                Some(SchemaNode::new(
                    path,
                    NodeKind::Scalar,
                    SourceRange::new(start, self.position()),
                ))
            }
        }
    }

    fn object(&mut self, path: NodePath, start: SourcePosition) -> SchemaNode {
        self.bump();
        let mut children = Vec::new();
        loop {
            self.skip_trivia();
            let key_start = self.position();
            let key = match self.peek() {
                None => break,
                Some('}') => {
                    self.bump();
                    break;
                }
                Some(',') => {
                    self.bump();
                    continue;
                }
                Some('"') | Some('\'') => unquote_json(&self.string()),
                Some(_) => {
                    let word = self.word();
                    if word.is_empty() {
                        self.bump();
                        continue;
                    }
                    word
                }
            };
            self.skip_trivia();
            if self.peek() != Some(':') {
                continue;
            }
            self.bump();
            self.skip_trivia();
            if let Some(mut child) = self.value(path.child(key)) {
                if matches!(child.kind, NodeKind::Mapping | NodeKind::Sequence) {
                    child.range.start = key_start;
                }
                children.push(child);
            }
        }
        SchemaNode::new(path, NodeKind::Mapping, SourceRange::new(start, self.position()))
            .with_children(children)
    }

    fn array(&mut self, path: NodePath, start: SourcePosition) -> SchemaNode {
        self.bump();
        let mut children = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None | Some('}') => break,
                Some(']') => {
                    self.bump();
                    break;
                }
                Some(',') => {
                    self.bump();
                }
                Some(_) => {
                    if let Some(child) = self.value(path.child(children.len().to_string())) {
                        children.push(child);
                    }
                }
            }
        }
        SchemaNode::new(path, NodeKind::Sequence, SourceRange::new(start, self.position()))
            .with_children(children)
    }
}

fn json_string_node(path: NodePath, raw: &str, start: SourcePosition) -> SchemaNode {
    let text = unquote_json(raw);
    if text.contains("${") {
        let references = references(&path, raw, start.line, start.column);
        return scalar_span(path, NodeKind::Substitution, start.line, start.column, raw)
            .with_children(references);
    }
    scalar_span(path, NodeKind::String(text), start.line, start.column, raw)
}

/// The text of a string literal with its quotes removed and escapes resolved.
fn unquote_json(raw: &str) -> String {
    if let Ok(text) = serde_json::from_str::<String>(raw) {
        return text;
    }
    let mut chars = raw.chars();
    let quote = chars.next();
    let inner = chars.as_str();
    match quote {
        Some(quote) if inner.ends_with(quote) => inner[..inner.len() - quote.len_utf8()].to_string(),
        _ => inner.to_string(),
    }
}

/// Value text without a trailing comment.
fn value_text(raw: &str) -> &str {
    let raw = raw.trim_end();
    if let Some(quote) = raw.chars().next().filter(|c| *c == '"' || *c == '\'') {
        return match raw[1..].find(quote) {
            Some(close) => &raw[..close + 2],
            None => raw,
        };
    }
    match raw.find(" #") {
        Some(comment) => raw[..comment].trim_end(),
        None => raw,
    }
}

fn scalar_span(path: NodePath, kind: NodeKind, line: usize, column: usize, text: &str) -> SchemaNode {
    SchemaNode::new(
        path,
        kind,
        SourceRange::new(
            SourcePosition::new(line, column),
            SourcePosition::new(line, column + text.chars().count()),
        ),
    )
}

fn value_node(path: NodePath, value: &str, line: usize, column: usize) -> SchemaNode {
    if value.starts_with('[') && value.ends_with(']') {
        return flow_sequence(path, value, line, column);
    }
    if value.starts_with('{') {
        return scalar_span(path, NodeKind::Mapping, line, column, value);
    }

    let quoted = value.len() >= 2
        && (value.starts_with('"') || value.starts_with('\''))
        && value.ends_with(&value[..1]);
    let unquoted = if quoted { &value[1..value.len() - 1] } else { value };

    if unquoted.contains("${") {
        let references = references(&path, value, line, column);
        return scalar_span(path.clone(), NodeKind::Substitution, line, column, value)
            .with_children(references);
    }
    let kind = if quoted || !is_plain_literal(unquoted) {
        NodeKind::String(unquoted.to_string())
    } else {
        NodeKind::Scalar
    };
    scalar_span(path, kind, line, column, value)
}

fn is_plain_literal(text: &str) -> bool {
    matches!(text, "true" | "false" | "null" | "~") || text.parse::<f64>().is_ok()
}

fn flow_sequence(path: NodePath, value: &str, line: usize, column: usize) -> SchemaNode {
    let mut children = Vec::new();
    let mut offset = 1;
    for (idx, part) in value[1..value.len() - 1].split(',').enumerate() {
        let leading = part.len() - part.trim_start().len();
        let item = part.trim();
        if !item.is_empty() {
            let item_column = column + value[..offset + leading].chars().count();
            children.push(value_node(path.child(idx.to_string()), item, line, item_column));
        }
        offset += part.len() + 1;
    }
    scalar_span(path, NodeKind::Sequence, line, column, value).with_children(children)
}

/// Reference nodes for every namespaced reference inside the substitutions of `value`,
/// plus the leading resource shorthand (`${ordersTable.spec.x}`).
fn references(path: &NodePath, value: &str, line: usize, column: usize) -> Vec<SchemaNode> {
    let column_of = |byte: usize| column + value[..byte].chars().count();
    let mut nodes = Vec::new();

    for substitution in SUBSTITUTION.captures_iter(value) {
        let Some(inner) = substitution.get(1) else {
            continue;
        };
        let text = inner.as_str();

        if let Some(leading) = LEADING_NAME.captures(text).and_then(|c| c.get(1)) {
            let follows = text[leading.end()..].chars().next();
            let is_shorthand = Namespace::from_prefix(leading.as_str()).is_none()
                && matches!(follows, None | Some('.') | Some('['));
            if is_shorthand {
                let start = inner.start() + leading.start();
                let end = inner.start() + leading.end();
                nodes.push(SchemaNode::new(
                    path.clone(),
                    NodeKind::Reference(ReferenceTarget::Resource(leading.as_str().to_string())),
                    SourceRange::new(
                        SourcePosition::new(line, column_of(start)),
                        SourcePosition::new(line, column_of(end)),
                    ),
                ));
            }
        }

        for reference in NAMESPACED.captures_iter(text) {
            let (Some(whole), Some(prefix), Some(name)) =
                (reference.get(0), reference.get(1), reference.get(2))
            else {
                continue;
            };
            let Some(namespace) = Namespace::from_prefix(prefix.as_str()) else {
                continue;
            };
            let start = inner.start() + whole.start();
            let end = inner.start() + whole.end();
            nodes.push(SchemaNode::new(
                path.clone(),
                NodeKind::Reference(ReferenceTarget::new(namespace, name.as_str())),
                SourceRange::new(
                    SourcePosition::new(line, column_of(start)),
                    SourcePosition::new(line, column_of(end)),
                ),
            ));
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SAMPLE_YAML;

    fn path(path: &str) -> NodePath {
        NodePath::parse(path)
    }

    #[test]
    fn mappings_span_their_blocks() {
        let tree = block_outline(SAMPLE_YAML);
        let table = tree.find(&path("/resources/ordersTable")).expect("resource node");
        assert_eq!(table.range.start, SourcePosition::new(26, 3));
        assert_eq!(table.range.end.map(|end| end.line), Some(32));
        assert_eq!(table.child_keys(), vec!["type", "metadata", "spec"]);

        let label = tree
            .find(&path("/resources/ordersTable/metadata/labels/app"))
            .expect("label node");
        assert_eq!(label.kind, NodeKind::String("orders".into()));
        assert_eq!(label.range.start, SourcePosition::new(30, 14));
    }

    #[test]
    fn scalars_are_typed() {
        let tree = block_outline(SAMPLE_YAML);
        let retries = tree.find(&path("/values/config/value/retries")).unwrap();
        assert_eq!(retries.kind, NodeKind::Scalar);
        let allowed = tree.find(&path("/variables/region/allowedValues")).unwrap();
        assert_eq!(allowed.kind, NodeKind::Sequence);
        assert_eq!(allowed.children.len(), 2);
        assert_eq!(allowed.children[1].kind, NodeKind::String("us-east-1".into()));
        assert_eq!(allowed.children[1].range.start, SourcePosition::new(5, 32));
    }

    #[test]
    fn block_sequences_index_their_items() {
        let tree = block_outline(
            "resources:\n  handler:\n    dependsOn:\n      - table\n      - queue\n    keys:\n    - name: id\n      type: S\n",
        );
        let second = tree.find(&path("/resources/handler/dependsOn/1")).unwrap();
        assert_eq!(second.kind, NodeKind::String("queue".into()));
        assert_eq!(second.range.start, SourcePosition::new(5, 9));

        let key_type = tree.find(&path("/resources/handler/keys/0/type")).unwrap();
        assert_eq!(key_type.kind, NodeKind::String("S".into()));
    }

    #[test]
    fn substitutions_carry_reference_nodes() {
        let tree = block_outline(
            "values:\n  url:\n    value: \"${join(resources.api.spec.url, variables.suffix)}\" # note\n  name:\n    value: ${api.spec.name}\n",
        );
        let url = tree.find(&path("/values/url/value")).unwrap();
        assert_eq!(url.kind, NodeKind::Substitution);
        let targets: Vec<_> = url
            .children
            .iter()
            .map(|child| (child.kind.clone(), child.range.start.column))
            .collect();
        assert_eq!(
            targets,
            vec![
                (NodeKind::Reference(ReferenceTarget::Resource("api".into())), 20),
                (NodeKind::Reference(ReferenceTarget::Variable("suffix".into())), 44),
            ]
        );

        let name = tree.find(&path("/values/name/value")).unwrap();
        assert_eq!(
            name.children[0].kind,
            NodeKind::Reference(ReferenceTarget::Resource("api".into()))
        );
    }

    #[test]
    fn compact_json_collections_start_at_their_keys() {
        let tree = jsonc_outline(
            "// app\n{\n  \"resources\": {\n    \"orders\": {\n      \"type\": \"aws/dynamodb/table\", /* keys */\n      \"dependsOn\": ['queue', \"a\\\"b\"],\n      retries: 3,\n    },\n  },\n}\n",
        );
        assert_eq!(tree.root.range.start, SourcePosition::new(1, 1));
        let orders = tree.find(&path("/resources/orders")).expect("resource node");
        assert_eq!(orders.range.start, SourcePosition::new(4, 5));
        assert_eq!(orders.range.end, Some(SourcePosition::new(8, 6)));
        assert_eq!(orders.child_keys(), vec!["type", "dependsOn", "retries"]);

        let type_node = tree.find(&path("/resources/orders/type")).unwrap();
        assert_eq!(type_node.kind, NodeKind::String("aws/dynamodb/table".into()));
        assert_eq!(type_node.range.start, SourcePosition::new(5, 15));

        let depends_on = tree.find(&path("/resources/orders/dependsOn")).unwrap();
        assert_eq!(depends_on.kind, NodeKind::Sequence);
        assert_eq!(depends_on.children[0].kind, NodeKind::String("queue".into()));
        assert_eq!(depends_on.children[1].kind, NodeKind::String("a\"b".into()));
        let retries = tree.find(&path("/resources/orders/retries")).unwrap();
        assert_eq!(retries.kind, NodeKind::Scalar);
    }

    #[test]
    fn compact_json_substitutions_carry_reference_nodes() {
        let tree = jsonc_outline(
            "{ \"values\": { \"url\": { \"value\": \"${join(resources.api.spec.url, variables.suffix)}\" } } }",
        );
        let url = tree.find(&path("/values/url/value")).unwrap();
        assert_eq!(url.kind, NodeKind::Substitution);
        let targets: Vec<_> = url
            .children
            .iter()
            .map(|child| (child.kind.clone(), child.range.start.column))
            .collect();
        assert_eq!(
            targets,
            vec![
                (NodeKind::Reference(ReferenceTarget::Resource("api".into())), 41),
                (NodeKind::Reference(ReferenceTarget::Variable("suffix".into())), 65),
            ]
        );
    }

    #[test]
    fn unterminated_compact_json_outlines_what_is_there() {
        let tree = jsonc_outline("{\n  \"resources\": {\n    \"orders\": { \"type\": \"aws/dyn");
        let orders = tree.find(&path("/resources/orders")).expect("open resource");
        assert_eq!(orders.range.end, Some(SourcePosition::new(3, 33)));
        assert_eq!(
            tree.find(&path("/resources/orders/type")).map(|node| node.kind.clone()),
            Some(NodeKind::String("aws/dyn".into()))
        );

        let empty = jsonc_outline("  // nothing yet\n");
        assert!(empty.root.children.is_empty());
    }

    #[test]
    fn literal_blocks_are_skipped() {
        let tree = block_outline("values:\n  script:\n    value: |\n      key: not a key\n  next:\n    value: 1\n");
        let script = tree.find(&path("/values/script")).unwrap();
        assert_eq!(script.child_keys(), vec!["value"]);
        assert!(tree.find(&path("/values/next/value")).is_some());
    }
}
