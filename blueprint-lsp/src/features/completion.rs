//! Protocol conversion for completion candidates
//!
//! Candidates carry their resolve tag as a [`ResolveData`] value. It travels to the
//! editor as the item's `data` and comes back on `completionItem/resolve`, where the
//! documentation is looked up.

use blueprint_analysis::{
    resolve_documentation, CompletionCandidate, CompletionList, Registries, RequestContext,
    ResolveData,
};
use tower_lsp::lsp_types::{
    CompletionItem, CompletionResponse, CompletionTextEdit, Documentation, MarkupContent,
    MarkupKind, TextEdit,
};
use tracing::{debug, warn};

fn markdown(value: String) -> Documentation {
    Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    })
}

pub fn to_completion_item(candidate: CompletionCandidate) -> CompletionItem {
    let data = candidate
        .resolve
        .as_ref()
        .and_then(|data| serde_json::to_value(data).ok());
    CompletionItem {
        label: candidate.label,
        detail: candidate.detail,
        kind: Some(candidate.kind),
        insert_text: candidate.insert_text,
        text_edit: candidate.edit.map(|edit| {
            CompletionTextEdit::Edit(TextEdit {
                range: edit.range,
                new_text: edit.new_text,
            })
        }),
        filter_text: candidate.filter_text,
        sort_text: candidate.sort_text,
        documentation: candidate.documentation.map(markdown),
        data,
        ..CompletionItem::default()
    }
}

pub fn to_completion_response(list: CompletionList) -> CompletionResponse {
    CompletionResponse::List(tower_lsp::lsp_types::CompletionList {
        is_incomplete: list.is_incomplete,
        items: list.items.into_iter().map(to_completion_item).collect(),
    })
}

/// Fill in the documentation of an item the editor asked to resolve. Items without
/// resolve data, or whose lookup fails, come back unchanged.
pub fn resolve_item(
    ctx: &RequestContext,
    registries: &Registries,
    mut item: CompletionItem,
) -> CompletionItem {
    let Some(data) = item.data.clone() else {
        return item;
    };
    let data: ResolveData = match serde_json::from_value(data) {
        Ok(data) => data,
        Err(err) => {
            debug!(error = %err, label = %item.label, "completion item carries foreign data");
            return item;
        }
    };
    match resolve_documentation(ctx, registries, &data) {
        Ok(Some(documentation)) => item.documentation = Some(markdown(documentation)),
        Ok(None) => {}
        Err(err) => warn!(error = %err, label = %item.label, "failed to resolve completion item"),
    }
    item
}
