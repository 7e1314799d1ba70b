//! Diagnostics published for a document
//!
//! A document that failed to load reports its load errors. One that loaded is validated
//! against the registries instead; its structure may be the fallback from an earlier
//! edit, so validation only runs when the current text loaded.

use blueprint_analysis::{
    collect_diagnostics, validate_blueprint, DiagnosticOptions, DocumentContext, Registries,
    RequestContext,
};
use tower_lsp::lsp_types::Diagnostic;
use tracing::debug;

pub fn document_diagnostics(
    ctx: &RequestContext,
    document: &DocumentContext,
    registries: &Registries,
    options: &DiagnosticOptions,
    max_problems: usize,
) -> Vec<Diagnostic> {
    let error = match &document.error {
        Some(error) => Some(error.clone()),
        None => validate_blueprint(ctx, document, registries),
    };
    let mut diagnostics = error
        .map(|error| collect_diagnostics(&error, options))
        .unwrap_or_default();
    if diagnostics.len() > max_problems {
        debug!(
            uri = %document.uri,
            total = diagnostics.len(),
            max_problems,
            "truncating diagnostics"
        );
        diagnostics.truncate(max_problems);
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_analysis::diagnostics::{SOURCE_SYNTAX, SOURCE_VALIDATOR};
    use blueprint_analysis::test_support::{document, sample_registries, SAMPLE_YAML};
    use blueprint_model::DocumentFormat;

    fn diagnostics(source: &str, max_problems: usize) -> Vec<Diagnostic> {
        document_diagnostics(
            &RequestContext::background(),
            &document(source, DocumentFormat::Yaml),
            &sample_registries(),
            &DiagnosticOptions::default(),
            max_problems,
        )
    }

    #[test]
    fn valid_documents_have_no_diagnostics() {
        assert!(diagnostics(SAMPLE_YAML, 100).is_empty());
    }

    #[test]
    fn load_errors_are_syntax_diagnostics() {
        let found = diagnostics("resources:\n  a: [\n", 100);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source.as_deref(), Some(SOURCE_SYNTAX));
    }

    #[test]
    fn validation_errors_are_capped() {
        let source = "resources:\n  a:\n    type: nope\n  b:\n    type: nope\n  c:\n    type: nope\n";
        let found = diagnostics(source, 100);
        assert_eq!(found.len(), 3);
        assert!(found
            .iter()
            .all(|diagnostic| diagnostic.source.as_deref() == Some(SOURCE_VALIDATOR)));
        assert_eq!(diagnostics(source, 2).len(), 2);
    }
}
