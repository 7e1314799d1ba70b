//! Cursor classification
//!
//! Completion starts by deciding what the cursor is in: a key of some definition, the
//! value of a known field, an item of a list, or a substitution. The structural position
//! comes from the schema tree when one of its nodes covers the cursor, and otherwise from
//! the text itself (indentation for the block format, braces for compact JSON), because
//! the document being edited often does not load.

use crate::document::DocumentContext;
use crate::formatter::{typed_prefix, TypedPrefix};
use crate::substitution::{
    active_substitution, open_quote, parse_reference_path, ActiveSubstitution, ReferencePath,
};
use blueprint_model::{DocumentFormat, Namespace, NodeKind, SchemaNode, SourcePosition};
use once_cell::sync::Lazy;
use regex::Regex;

/// Every kind of construct completion knows how to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionContextKind {
    // Registry-provided and core types
    ResourceType,
    DataSourceType,
    VariableType,
    ValueType,
    ExportType,
    DataSourceExportType,

    // Field names of definitions
    BlueprintTopLevelField,
    ResourceDefinitionField,
    ResourceMetadataField,
    ResourceAnnotationKey,
    LinkSelectorField,
    ResourceSpecField,
    VariableDefinitionField,
    ValueDefinitionField,
    DataSourceDefinitionField,
    DataSourceMetadataField,
    DataSourceFilterDefinitionField,
    DataSourceExportDefinitionField,
    IncludeDefinitionField,
    ExportDefinitionField,

    // Field values
    ResourceSpecFieldValue,
    ResourceAnnotationValue,
    LinkSelectorExcludeValue,
    DependsOnValue,
    DataSourceFilterField,
    DataSourceFilterOperator,
    DataSourceExportAliasFor,
    VariableDefaultValue,
    ExportFieldValue,

    // Inside `${..}`
    SubstitutionGeneric,
    SubstitutionVariableRef,
    SubstitutionResourceRef,
    SubstitutionResourceProperty,
    SubstitutionDataSourceRef,
    SubstitutionDataSourceProperty,
    SubstitutionValueRef,
    SubstitutionValueProperty,
    SubstitutionChildRef,
    SubstitutionChildProperty,

    Unknown,
}

impl CompletionContextKind {
    /// Kinds that complete the name of a field rather than a value.
    pub fn is_field_name(self) -> bool {
        use CompletionContextKind::*;
        matches!(
            self,
            BlueprintTopLevelField
                | ResourceDefinitionField
                | ResourceMetadataField
                | ResourceAnnotationKey
                | LinkSelectorField
                | ResourceSpecField
                | VariableDefinitionField
                | ValueDefinitionField
                | DataSourceDefinitionField
                | DataSourceMetadataField
                | DataSourceFilterDefinitionField
                | DataSourceExportDefinitionField
                | IncludeDefinitionField
                | ExportDefinitionField
        )
    }

    pub fn is_substitution(self) -> bool {
        use CompletionContextKind::*;
        matches!(
            self,
            SubstitutionGeneric
                | SubstitutionVariableRef
                | SubstitutionResourceRef
                | SubstitutionResourceProperty
                | SubstitutionDataSourceRef
                | SubstitutionDataSourceProperty
                | SubstitutionValueRef
                | SubstitutionValueProperty
                | SubstitutionChildRef
                | SubstitutionChildProperty
        )
    }

    /// Whether completion for this kind runs in documents of `format`.
    ///
    /// Compact JSON editors complete object keys on their own, so field names are only
    /// offered in the block format.
    pub fn enabled_for(self, format: DocumentFormat) -> bool {
        match format {
            DocumentFormat::Yaml => self != CompletionContextKind::Unknown,
            DocumentFormat::Jsonc => !self.is_field_name() && self != CompletionContextKind::Unknown,
        }
    }
}

/// Where on its line the cursor sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorSlot {
    /// Typing a key of the enclosing mapping.
    Key,
    /// Typing the value of `key`.
    Value { key: String },
    /// Typing an item of the enclosing sequence.
    ListItem,
}

/// The substitution, or reference-valued field, the cursor is inside of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionContext {
    /// Text from the start of the reference up to the cursor.
    pub inner: String,
    /// 0-indexed column where the reference starts.
    pub start_column: u32,
    pub enclosing_quote: Option<char>,
    pub reference: Option<ReferencePath>,
}

impl SubstitutionContext {
    fn new(
        inner: String,
        start_column: u32,
        enclosing_quote: Option<char>,
        document: &DocumentContext,
    ) -> Self {
        let reference = document
            .blueprint
            .as_ref()
            .and_then(|blueprint| parse_reference_path(&inner, blueprint))
            .map(|mut reference| {
                reference.access.enclosing_quote = enclosing_quote;
                reference
            });
        Self {
            inner,
            start_column,
            enclosing_quote,
            reference,
        }
    }

    /// The substitution kind this reference completes.
    pub fn kind(&self) -> CompletionContextKind {
        use CompletionContextKind::*;
        let Some(reference) = &self.reference else {
            return SubstitutionGeneric;
        };
        let has_entity = reference.entity_name.is_some();
        match (reference.namespace, has_entity) {
            (Namespace::Resources, false) => SubstitutionResourceRef,
            (Namespace::Resources, true) => SubstitutionResourceProperty,
            (Namespace::DataSources, false) => SubstitutionDataSourceRef,
            (Namespace::DataSources, true) => SubstitutionDataSourceProperty,
            (Namespace::Variables, _) => SubstitutionVariableRef,
            (Namespace::Values, false) => SubstitutionValueRef,
            (Namespace::Values, true) => SubstitutionValueProperty,
            (Namespace::Children, false) => SubstitutionChildRef,
            (Namespace::Children, true) => SubstitutionChildProperty,
        }
    }

    /// Text typed after the last committed separator.
    pub fn filter_prefix(&self) -> &str {
        match &self.reference {
            Some(reference) => &reference.filter_prefix,
            None => &self.inner,
        }
    }
}

/// Everything completion needs to know about the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorContext {
    pub kind: CompletionContextKind,
    /// Structural path of the mapping or sequence enclosing the cursor, list indices
    /// included.
    pub path: Vec<String>,
    pub slot: CursorSlot,
    pub prefix: TypedPrefix,
    pub substitution: Option<SubstitutionContext>,
}

impl CursorContext {
    /// The name of the entity whose definition encloses the cursor, e.g. the resource name
    /// for anything under `resources.<name>`.
    pub fn entity_name(&self) -> Option<&str> {
        self.path.get(1).map(String::as_str)
    }

    /// Path segments after `segment`, e.g. the spec path after `spec`.
    pub fn path_after(&self, segment: &str) -> Vec<String> {
        let mut full = self.path.clone();
        if let CursorSlot::Value { key } = &self.slot {
            full.push(key.clone());
        }
        match full.iter().position(|s| s == segment) {
            Some(idx) => full[idx + 1..].to_vec(),
            None => Vec::new(),
        }
    }
}

/// Classify the cursor at `pos`.
pub fn classify(document: &DocumentContext, pos: SourcePosition, leeway: usize) -> CursorContext {
    let line_before = document.line_before(pos);
    let prefix = typed_prefix(line_before);

    let active = tree_substitution(document, pos, leeway, line_before)
        .map(Ok)
        .unwrap_or_else(|| active_substitution(line_before));
    if let Ok(active) = active {
        let substitution = SubstitutionContext::new(
            active.inner,
            active.start_column,
            active.enclosing_quote,
            document,
        );
        return CursorContext {
            kind: substitution.kind(),
            path: Vec::new(),
            slot: CursorSlot::Value { key: String::new() },
            prefix,
            substitution: Some(substitution),
        };
    }

    let (path, slot) = structural_position(document, pos, leeway, &prefix);
    let kind = classify_structural(&path, &slot);
    let substitution = (kind == CompletionContextKind::ExportFieldValue).then(|| {
        let (inner, start_column, quote) = value_text(line_before);
        SubstitutionContext::new(inner, start_column, quote, document)
    });

    CursorContext {
        kind,
        path,
        slot,
        prefix,
        substitution,
    }
}

/// The reference the cursor is typing according to the schema tree.
///
/// A `Reference` node covering the cursor wins; otherwise the last reference of the
/// enclosing substitution that starts before the cursor on its line. The reference text
/// is read from the current line, and a closing `}` between the reference and the cursor
/// means the substitution is already closed.
fn tree_substitution(
    document: &DocumentContext,
    pos: SourcePosition,
    leeway: usize,
    line_before: &str,
) -> Option<ActiveSubstitution> {
    let nodes = document.nodes_at(pos, leeway);
    let substitution = nodes
        .iter()
        .rev()
        .find(|node| matches!(node.kind, NodeKind::Substitution))?;
    let starts_before_cursor = |node: &SchemaNode| {
        matches!(node.kind, NodeKind::Reference(_))
            && node.range.start.line == pos.line
            && node.range.start.column <= pos.column
    };
    let reference = nodes
        .iter()
        .rev()
        .copied()
        .find(|node| starts_before_cursor(*node))
        .or_else(|| {
            substitution
                .children
                .iter()
                .filter(|node| starts_before_cursor(*node))
                .last()
        })?;

    let start = reference.range.start.column.saturating_sub(1);
    let chars: Vec<char> = line_before.chars().collect();
    if start > chars.len() {
        return None;
    }
    let prefix: String = chars[..start].iter().collect();
    let inner: String = chars[start..].iter().collect();
    let opener = prefix.rfind("${")?;
    if inner.contains('}') || prefix[opener..].contains('}') {
        return None;
    }
    Some(ActiveSubstitution {
        enclosing_quote: open_quote(&prefix[..opener]),
        inner,
        start_column: start as u32,
    })
}

static YAML_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:-\s+)?("[^"]*"|'[^']*'|[^\s:#'"-][^:#]*?)\s*:(?:\s|$)"#)
        .expect("block key regex")
});

static YAML_LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*-(?:\s|$)").expect("block list item regex"));

fn unquote(key: &str) -> String {
    key.trim_matches(|c| c == '"' || c == '\'').to_string()
}

/// The key declared on a block-format line and the column it starts at.
pub(crate) fn block_key(line: &str) -> Option<(usize, String)> {
    block_entry(line).map(|(column, key, _)| (column, key))
}

/// Like [`block_key`], plus the byte offset where the value text starts.
pub(crate) fn block_entry(line: &str) -> Option<(usize, String, usize)> {
    let captures = YAML_KEY.captures(line)?;
    let key = captures.get(1)?;
    let value_start = captures.get(0)?.end();
    Some((
        line[..key.start()].chars().count(),
        unquote(key.as_str()),
        value_start,
    ))
}

/// The key/value slot of a block-format line.
fn yaml_slot(line_before: &str) -> CursorSlot {
    if let Some(captures) = YAML_KEY.captures(line_before) {
        return CursorSlot::Value {
            key: unquote(&captures[1]),
        };
    }
    if YAML_LIST_ITEM.is_match(line_before) {
        return CursorSlot::ListItem;
    }
    CursorSlot::Key
}

fn indentation(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

/// Recover the enclosing path of a block-format cursor from indentation.
fn yaml_text_path(text_before: &str, slot: &CursorSlot) -> Vec<String> {
    let mut lines = text_before.split('\n').rev();
    let cursor_line = lines.next().unwrap_or_default();
    let mut current_indent = indentation(cursor_line);
    // A list item may sit at the same indentation as its parent key.
    let mut allow_equal = matches!(slot, CursorSlot::ListItem)
        || (YAML_LIST_ITEM.is_match(cursor_line) && matches!(slot, CursorSlot::Value { .. }));
    let mut path = Vec::new();

    for line in lines {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = indentation(line);
        let is_item = YAML_LIST_ITEM.is_match(line);
        let qualifies = indent < current_indent || (allow_equal && indent == current_indent && !is_item);
        if !qualifies {
            continue;
        }
        if is_item && indent < current_indent {
            path.push("0".to_string());
        } else if let Some(captures) = YAML_KEY.captures(line) {
            path.push(unquote(&captures[1]));
        } else {
            continue;
        }
        current_indent = indent;
        allow_equal = false;
        if current_indent == 0 {
            break;
        }
    }

    path.reverse();
    path
}

enum JsonFrame {
    Object { key: Option<String>, in_value: bool },
    Array { index: usize },
}

/// Recover the enclosing path and slot of a compact-JSON cursor from its braces.
fn jsonc_text_path(text_before: &str) -> (Vec<String>, CursorSlot) {
    let chars: Vec<char> = text_before.chars().collect();
    let mut frames: Vec<JsonFrame> = Vec::new();
    let mut last_string: Option<String> = None;
    let mut current = String::new();
    let mut in_string = false;
    let mut idx = 0;

    while idx < chars.len() {
        let ch = chars[idx];
        if in_string {
            match ch {
                '\\' => {
                    if let Some(next) = chars.get(idx + 1) {
                        current.push(*next);
                    }
                    idx += 1;
                }
                '"' => {
                    in_string = false;
                    last_string = Some(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            }
            idx += 1;
            continue;
        }
        match (ch, chars.get(idx + 1)) {
            ('/', Some('/')) => {
                while idx < chars.len() && chars[idx] != '\n' {
                    idx += 1;
                }
                continue;
            }
            ('/', Some('*')) => {
                idx += 2;
                while idx < chars.len() && !(chars[idx] == '*' && chars.get(idx + 1) == Some(&'/')) {
                    idx += 1;
                }
                idx += 2;
                continue;
            }
            ('"', _) => {
                in_string = true;
                current.clear();
            }
            ('{', _) => frames.push(JsonFrame::Object {
                key: None,
                in_value: false,
            }),
            ('[', _) => frames.push(JsonFrame::Array { index: 0 }),
            ('}', _) | (']', _) => {
                frames.pop();
            }
            (':', _) => {
                if let Some(JsonFrame::Object { key, in_value }) = frames.last_mut() {
                    *key = last_string.take();
                    *in_value = true;
                }
            }
            (',', _) => match frames.last_mut() {
                Some(JsonFrame::Object { key, in_value }) => {
                    *key = None;
                    *in_value = false;
                }
                Some(JsonFrame::Array { index }) => *index += 1,
                None => {}
            },
            _ => {}
        }
        idx += 1;
    }

    let Some((top, enclosing)) = frames.split_last() else {
        return (Vec::new(), CursorSlot::Key);
    };
    let path = enclosing
        .iter()
        .filter_map(|frame| match frame {
            JsonFrame::Object { key, .. } => key.clone(),
            JsonFrame::Array { index } => Some(index.to_string()),
        })
        .collect();
    let slot = match top {
        JsonFrame::Object {
            key: Some(key),
            in_value: true,
        } => CursorSlot::Value { key: key.clone() },
        JsonFrame::Object { .. } => CursorSlot::Key,
        JsonFrame::Array { .. } => CursorSlot::ListItem,
    };
    (path, slot)
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}

/// Enclosing path and slot of the cursor, from the tree when a node covers the cursor
/// and from the text otherwise.
fn structural_position(
    document: &DocumentContext,
    pos: SourcePosition,
    leeway: usize,
    prefix: &TypedPrefix,
) -> (Vec<String>, CursorSlot) {
    let text_before = document.text_before(pos);
    let (text_path, slot) = match document.format {
        DocumentFormat::Yaml => {
            let slot = yaml_slot(document.line_before(pos));
            (yaml_text_path(text_before, &slot), slot)
        }
        DocumentFormat::Jsonc => jsonc_text_path(text_before),
    };

    let tree_path = document
        .nodes_at(pos, leeway)
        .last()
        .filter(|node| !node.path.is_empty())
        .map(|node| node.path.segments().to_vec());
    let Some(mut path) = tree_path else {
        return (text_path, slot);
    };

    // The innermost node can be the scalar being typed; the enclosing path stops above it.
    match &slot {
        CursorSlot::Value { key } if path.last() == Some(key) => {
            path.pop();
        }
        CursorSlot::Key if !prefix.text.is_empty() && path.last() == Some(&prefix.text) => {
            path.pop();
        }
        CursorSlot::ListItem if path.last().is_some_and(|s| is_index(s)) => {
            path.pop();
        }
        _ => {}
    }
    (path, slot)
}

/// Map a structural position onto a completion kind.
pub fn classify_structural(path: &[String], slot: &CursorSlot) -> CompletionContextKind {
    use CompletionContextKind::*;
    let mut segments: Vec<&str> = path
        .iter()
        .map(String::as_str)
        .filter(|segment| !is_index(segment))
        .collect();

    match slot {
        CursorSlot::Key => match segments.as_slice() {
            [] => BlueprintTopLevelField,
            ["resources", _] => ResourceDefinitionField,
            ["resources", _, "metadata"] => ResourceMetadataField,
            ["resources", _, "metadata", "annotations"] => ResourceAnnotationKey,
            ["resources", _, "linkSelector"] => LinkSelectorField,
            ["resources", _, "spec", ..] => ResourceSpecField,
            ["variables", _] => VariableDefinitionField,
            ["values", _] => ValueDefinitionField,
            ["datasources", _] => DataSourceDefinitionField,
            ["datasources", _, "metadata"] => DataSourceMetadataField,
            ["datasources", _, "filter"] => DataSourceFilterDefinitionField,
            ["datasources", _, "exports", _] => DataSourceExportDefinitionField,
            ["include", _] => IncludeDefinitionField,
            ["exports", _] => ExportDefinitionField,
            _ => Unknown,
        },
        CursorSlot::Value { key } => {
            segments.push(key.as_str());
            match segments.as_slice() {
                ["resources", _, "type"] => ResourceType,
                ["datasources", _, "type"] => DataSourceType,
                ["variables", _, "type"] => VariableType,
                ["values", _, "type"] => ValueType,
                ["exports", _, "type"] => ExportType,
                ["datasources", _, "exports", _, "type"] => DataSourceExportType,
                ["resources", _, "spec", _, ..] => ResourceSpecFieldValue,
                ["resources", _, "metadata", "annotations", _] => ResourceAnnotationValue,
                ["resources", _, "linkSelector", "exclude"] => LinkSelectorExcludeValue,
                ["resources", _, "dependsOn"] => DependsOnValue,
                ["datasources", _, "filter", "field"] => DataSourceFilterField,
                ["datasources", _, "filter", "operator"] => DataSourceFilterOperator,
                ["datasources", _, "exports", _, "aliasFor"] => DataSourceExportAliasFor,
                ["variables", _, "default"] => VariableDefaultValue,
                ["exports", _, "field"] => ExportFieldValue,
                _ => Unknown,
            }
        }
        CursorSlot::ListItem => match segments.as_slice() {
            ["resources", _, "linkSelector", "exclude"] => LinkSelectorExcludeValue,
            ["resources", _, "dependsOn"] => DependsOnValue,
            ["datasources", _, "filter"] => DataSourceFilterDefinitionField,
            _ => Unknown,
        },
    }
}

/// The value typed after the `key:` of a line, the column it starts at and the quote
/// opening it, if any.
fn value_text(line_before: &str) -> (String, u32, Option<char>) {
    let Some(colon) = line_before.rfind(':') else {
        return (
            line_before.trim_start().to_string(),
            indentation(line_before) as u32,
            None,
        );
    };
    let after = line_before[colon + 1..].trim_start();
    let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'');
    let value = match quote {
        Some(q) => &after[q.len_utf8()..],
        None => after,
    };
    let start = line_before.len() - value.len();
    (
        value.to_string(),
        line_before[..start].chars().count() as u32,
        quote,
    )
}
