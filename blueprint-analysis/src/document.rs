//! A loaded document as seen by the analysis features

use blueprint_model::{
    Blueprint, BlueprintError, DocumentFormat, LineIndex, LoadedDocument, SchemaNode, SchemaTree,
    SourcePosition,
};
use lsp_types::Url;

/// Text, format and load results of one open document.
///
/// `blueprint` and `tree` may be stale: the document store keeps the last successful
/// load when the current text does not parse. Features that need to be exact about
/// what is under the cursor read the text as well.
#[derive(Debug)]
pub struct DocumentContext {
    pub uri: Url,
    pub content: String,
    pub format: DocumentFormat,
    pub blueprint: Option<Blueprint>,
    pub tree: Option<SchemaTree>,
    pub error: Option<BlueprintError>,
    line_index: LineIndex,
}

impl DocumentContext {
    pub fn new(uri: Url, content: String, format: DocumentFormat, loaded: LoadedDocument) -> Self {
        let line_index = LineIndex::new(&content);
        Self {
            uri,
            content,
            format,
            blueprint: loaded.blueprint,
            tree: loaded.tree,
            error: loaded.error,
            line_index,
        }
    }

    /// Keep the structure of `previous` when the current text did not load.
    pub fn with_fallback(mut self, previous: &DocumentContext) -> Self {
        if self.blueprint.is_none() {
            self.blueprint = previous.blueprint.clone();
            if self.tree.is_none() {
                self.tree = previous.tree.clone();
            }
        }
        self
    }

    /// The document text from the start up to `pos`.
    pub fn text_before(&self, pos: SourcePosition) -> &str {
        let offset = self.line_index.offset_of(pos);
        let byte = self
            .content
            .char_indices()
            .nth(offset)
            .map(|(byte, _)| byte)
            .unwrap_or(self.content.len());
        &self.content[..byte]
    }

    /// The text of the cursor line up to `pos`.
    pub fn line_before(&self, pos: SourcePosition) -> &str {
        let before = self.text_before(pos);
        match before.rfind('\n') {
            Some(newline) => &before[newline + 1..],
            None => before,
        }
    }

    /// Tree nodes covering `pos`, outermost first. Empty without a tree.
    pub fn nodes_at(&self, pos: SourcePosition, leeway: usize) -> Vec<&SchemaNode> {
        self.tree
            .as_ref()
            .map(|tree| tree.nodes_covering(pos, leeway))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(content: &str) -> DocumentContext {
        DocumentContext::new(
            Url::parse("file:///work/app.blueprint.yml").unwrap(),
            content.to_string(),
            DocumentFormat::Yaml,
            LoadedDocument::default(),
        )
    }

    #[test]
    fn slices_text_before_the_cursor() {
        let doc = context("resources:\n  orders:\n    type: aws/dyn\n");
        assert_eq!(doc.line_before(SourcePosition::new(3, 18)), "    type: aws/dyn");
        assert_eq!(doc.line_before(SourcePosition::new(3, 11)), "    type: ");
        assert!(doc.text_before(SourcePosition::new(2, 1)).ends_with("resources:\n"));
    }

    #[test]
    fn handles_multibyte_text() {
        let doc = context("description: caf\u{e9} \u{2603}\nnext: 1\n");
        assert_eq!(doc.line_before(SourcePosition::new(1, 20)), "description: caf\u{e9} \u{2603}");
    }

    #[test]
    fn falls_back_to_previous_structure() {
        let mut previous = context("resources: {}\n");
        previous.blueprint = Some(Blueprint::default());
        let current = context("resources: [\n").with_fallback(&previous);
        assert_eq!(current.blueprint, Some(Blueprint::default()));
    }
}
