//! Field names: fixed definition fields, resource spec fields and link annotation keys.

use super::{CompletionCandidate, Request, TypeLookup};
use crate::context::block_key;
use crate::fields::FieldInfo;
use crate::formatter::yaml_requires_quotes;
use crate::links::{annotation_key_candidates, applicable_annotation_definitions, LinkInferer};
use blueprint_model::NodePath;
use lsp_types::CompletionItemKind;

/// Keys already present in the mapping the cursor is typing a key of.
///
/// Read from the tree when it knows the enclosing mapping, and otherwise from the lines
/// around the cursor at the same indentation.
fn present_keys(request: &Request<'_>) -> Vec<String> {
    let path = NodePath::from_segments(request.cursor.path.iter().cloned());
    if let Some(node) = request.document.tree.as_ref().and_then(|tree| tree.find(&path)) {
        if !path.is_empty() {
            return node.child_keys().into_iter().map(str::to_string).collect();
        }
    }
    sibling_keys(&request.document.content, request.position.line)
}

fn indentation(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

fn is_blank(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Keys declared at the cursor line's indentation within the same block.
fn sibling_keys(content: &str, cursor_line: usize) -> Vec<String> {
    let lines: Vec<&str> = content.split('\n').collect();
    let Some(cursor_idx) = cursor_line.checked_sub(1).filter(|idx| *idx < lines.len()) else {
        return Vec::new();
    };
    let column = indentation(lines[cursor_idx]);
    let mut keys = Vec::new();

    // An enclosing list item carries the first key of the mapping on its own line.
    for line in lines[..cursor_idx].iter().rev() {
        if is_blank(line) {
            continue;
        }
        if let Some((key_column, key)) = block_key(line) {
            if key_column == column {
                keys.push(key);
            }
        }
        if indentation(line) < column {
            break;
        }
    }
    for line in &lines[cursor_idx + 1..] {
        if is_blank(line) {
            continue;
        }
        if indentation(line) < column {
            break;
        }
        if let Some((key_column, key)) = block_key(line) {
            if key_column == column && indentation(line) == column {
                keys.push(key);
            }
        }
    }
    keys
}

fn key_text(key: &str) -> String {
    if yaml_requires_quotes(key) {
        format!("\"{key}\": ")
    } else {
        format!("{key}: ")
    }
}

/// Fields of a definition that are not declared yet.
pub(super) fn definition_fields(
    request: &Request<'_>,
    fields: &[FieldInfo],
) -> Vec<CompletionCandidate> {
    let present = present_keys(request);
    fields
        .iter()
        .filter(|field| !present.iter().any(|key| key == field.name))
        .map(|field| {
            CompletionCandidate::new(field.name, CompletionItemKind::FIELD)
                .with_detail(field.description)
                .with_insert_text(key_text(field.name))
        })
        .collect()
}

pub(super) fn spec_fields(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let Some(name) = request.cursor.entity_name() else {
        return Vec::new();
    };
    let schema = match request.resource_spec(name) {
        TypeLookup::Found(schema) => schema,
        TypeLookup::Unknown(resource_type) => {
            return vec![request.not_found_hint("Resource", &resource_type)]
        }
        TypeLookup::Untyped => return Vec::new(),
    };
    let path = request.cursor.path_after("spec");
    let Some(attributes) = schema.navigate(&path).and_then(|node| node.attributes()) else {
        return Vec::new();
    };
    let present = present_keys(request);
    attributes
        .iter()
        .filter(|(key, _)| !present.contains(key))
        .map(|(key, attribute)| {
            CompletionCandidate::new(key.clone(), CompletionItemKind::FIELD)
                .with_detail("Spec field")
                .with_documentation(attribute.description.clone())
                .with_insert_text(key_text(key))
        })
        .collect()
}

/// Link annotation keys the current resource may declare, given the resources it links to.
pub(super) fn annotation_keys(request: &Request<'_>) -> Vec<CompletionCandidate> {
    let (Some(blueprint), Some(name)) = (request.blueprint(), request.cursor.entity_name()) else {
        return Vec::new();
    };
    let Some(current_type) = blueprint
        .resource(name)
        .and_then(|resource| resource.resource_type.as_deref())
    else {
        return Vec::new();
    };

    let inferer = LinkInferer::new(request.registries.links.as_deref(), request.links);
    let links = inferer.linked_resources(request.ctx, blueprint, name);
    let definitions = applicable_annotation_definitions(current_type, &links);
    let present = present_keys(request);

    annotation_key_candidates(&definitions, &links)
        .into_iter()
        .filter(|(key, _)| !present.contains(key))
        .map(|(key, with_context)| {
            let definition = &with_context.definition;
            let detail = definition
                .label
                .clone()
                .unwrap_or_else(|| format!("Link annotation for {}", with_context.other_resource_type));
            CompletionCandidate::new(key.clone(), CompletionItemKind::PROPERTY)
                .with_detail(detail)
                .with_documentation(definition.description.clone())
                .with_insert_text(key_text(&key))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_keys_stay_within_the_block() {
        let content = "resources:\n  orders:\n    type: a/b\n    \n    spec: {}\n  other:\n    description: x\n";
        let keys = sibling_keys(content, 4);
        assert_eq!(keys, vec!["type".to_string(), "spec".to_string()]);
    }

    #[test]
    fn sibling_keys_include_the_list_item_key() {
        let content = "filter:\n  - field: tags\n    \n    search: x\n  - field: name\n";
        let keys = sibling_keys(content, 3);
        assert_eq!(keys, vec!["field".to_string(), "search".to_string()]);
    }

    #[test]
    fn keys_are_quoted_when_needed() {
        assert_eq!(key_text("type"), "type: ");
        assert_eq!(key_text("a:b"), "\"a:b\": ");
    }
}
