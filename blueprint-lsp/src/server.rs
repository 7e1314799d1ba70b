//! Main language server implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::features::completion::{resolve_item, to_completion_response};
use crate::features::diagnostics::document_diagnostics;
use crate::features::settings::DocumentSettings;
use blueprint_analysis::position::from_protocol;
use blueprint_analysis::{
    find_definition, ChildBlueprints, CompletionList, CompletionOptions, CompletionService,
    DefinitionLink, DiagnosticOptions, DocumentContext, FileChildSource, InMemoryRegistry,
    Registries, RequestContext,
};
use blueprint_config::ServerConfig;
use blueprint_model::{BlueprintLoader, DocumentFormat, SerdeLoader, SourcePosition};
use tokio::sync::RwLock;
use tower_lsp::async_trait;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionOptions as LspCompletionOptions, CompletionParams,
    CompletionResponse, Diagnostic, DidChangeConfigurationParams, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    GotoDefinitionParams, GotoDefinitionResponse, InitializeParams, InitializeResult,
    InitializedParams, LocationLink, OneOf, SaveOptions, ServerCapabilities, ServerInfo,
    TextDocumentItem, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, TextDocumentSyncSaveOptions, Url,
};
use tower_lsp::Client;
use tracing::{debug, info, warn};

/// Characters after which editors should ask for completions.
pub const TRIGGER_CHARACTERS: &[&str] = &["{", ".", "\"", "[", ":", " "];

#[async_trait]
pub trait LspClient: Send + Sync + Clone + 'static {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>);
}

#[async_trait]
impl LspClient for Client {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        Client::publish_diagnostics(self, uri, diagnostics, version).await;
    }
}

pub trait FeatureProvider: Send + Sync + 'static {
    fn completion(&self, document: &DocumentContext, position: SourcePosition) -> CompletionList;
    fn resolve_completion(&self, item: CompletionItem) -> CompletionItem;
    fn diagnostics(&self, document: &DocumentContext, settings: &DocumentSettings)
        -> Vec<Diagnostic>;
    fn definition(&self, document: &DocumentContext, position: SourcePosition)
        -> Option<DefinitionLink>;
    /// Forget anything cached from the file behind `uri`.
    fn invalidate(&self, uri: &Url);
}

/// Request-independent knobs of the default feature provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureOptions {
    pub cursor_leeway: usize,
    pub registry_timeout: Duration,
    pub diagnostics: DiagnosticOptions,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            cursor_leeway: CompletionOptions::default().cursor_leeway,
            registry_timeout: Duration::from_secs(5),
            diagnostics: DiagnosticOptions::default(),
        }
    }
}

impl FeatureOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            cursor_leeway: config.completion.cursor_leeway,
            registry_timeout: config.registry.timeout(),
            diagnostics: DiagnosticOptions {
                max_available_fields: config.diagnostics.max_available_fields,
            },
        }
    }
}

pub struct DefaultFeatureProvider {
    completion: CompletionService,
    options: FeatureOptions,
}

impl DefaultFeatureProvider {
    pub fn new(registries: Registries, options: FeatureOptions) -> Self {
        let children = ChildBlueprints::new(Arc::new(FileChildSource::new(SerdeLoader::new())));
        let completion = CompletionService::new(
            registries,
            Arc::new(children),
            CompletionOptions {
                cursor_leeway: options.cursor_leeway,
            },
        );
        Self {
            completion,
            options,
        }
    }

    fn request(&self) -> RequestContext {
        RequestContext::with_timeout(self.options.registry_timeout)
    }
}

impl Default for DefaultFeatureProvider {
    fn default() -> Self {
        Self::new(
            Registries::from_memory(InMemoryRegistry::with_core_functions()),
            FeatureOptions::default(),
        )
    }
}

impl FeatureProvider for DefaultFeatureProvider {
    fn completion(&self, document: &DocumentContext, position: SourcePosition) -> CompletionList {
        self.completion.complete(&self.request(), document, position)
    }

    fn resolve_completion(&self, item: CompletionItem) -> CompletionItem {
        resolve_item(&self.request(), self.completion.registries(), item)
    }

    fn diagnostics(
        &self,
        document: &DocumentContext,
        settings: &DocumentSettings,
    ) -> Vec<Diagnostic> {
        document_diagnostics(
            &self.request(),
            document,
            self.completion.registries(),
            &self.options.diagnostics,
            settings.max_number_of_problems,
        )
    }

    fn definition(
        &self,
        document: &DocumentContext,
        position: SourcePosition,
    ) -> Option<DefinitionLink> {
        find_definition(document, position, self.options.cursor_leeway)
    }

    fn invalidate(&self, uri: &Url) {
        self.completion.children().invalidate_uri(uri);
    }
}

/// One open document. The text lives in `parsed`.
#[derive(Clone)]
struct DocumentState {
    parsed: Arc<DocumentContext>,
    settings: DocumentSettings,
    version: Option<i32>,
}

struct DocumentStore {
    loader: Arc<dyn BlueprintLoader>,
    entries: RwLock<HashMap<Url, DocumentState>>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(Arc::new(SerdeLoader::new()))
    }
}

impl DocumentStore {
    fn new(loader: Arc<dyn BlueprintLoader>) -> Self {
        Self {
            loader,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Load `text` and store it, keeping the previous structure when the text does not
    /// load. Documents in an unsupported format are not stored.
    async fn upsert(
        &self,
        uri: Url,
        text: String,
        version: Option<i32>,
        settings: DocumentSettings,
    ) -> Option<DocumentState> {
        let format = match DocumentFormat::from_path(uri.path()) {
            Ok(format) => format,
            Err(err) => {
                debug!(%uri, error = %err, "not a blueprint document");
                return None;
            }
        };
        let loaded = self.loader.load(&text, format);
        let current = DocumentContext::new(uri.clone(), text, format, loaded);

        let mut entries = self.entries.write().await;
        let parsed = match entries.get(&uri) {
            Some(previous) => current.with_fallback(&previous.parsed),
            None => current,
        };
        if parsed.blueprint.is_none() {
            debug!(%uri, "document has no loaded blueprint");
        }
        let state = DocumentState {
            parsed: Arc::new(parsed),
            settings,
            version,
        };
        entries.insert(uri, state.clone());
        Some(state)
    }

    async fn get(&self, uri: &Url) -> Option<DocumentState> {
        self.entries.read().await.get(uri).cloned()
    }

    async fn remove(&self, uri: &Url) {
        self.entries.write().await.remove(uri);
    }

    /// Replace the settings of every open document, returning the updated states.
    async fn reconfigure(&self, settings: &DocumentSettings) -> Vec<(Url, DocumentState)> {
        let mut entries = self.entries.write().await;
        entries
            .iter_mut()
            .map(|(uri, state)| {
                state.settings = settings.clone();
                (uri.clone(), state.clone())
            })
            .collect()
    }
}

pub struct BlueprintLanguageServer<C = Client, P = DefaultFeatureProvider> {
    client: C,
    documents: DocumentStore,
    features: Arc<P>,
    settings: RwLock<DocumentSettings>,
}

impl BlueprintLanguageServer<Client, DefaultFeatureProvider> {
    pub fn new(client: Client) -> Self {
        Self::with_features(client, Arc::new(DefaultFeatureProvider::default()))
    }
}

impl<C, P> BlueprintLanguageServer<C, P>
where
    C: LspClient,
    P: FeatureProvider,
{
    pub fn with_features(client: C, features: Arc<P>) -> Self {
        Self {
            client,
            documents: DocumentStore::default(),
            features,
            settings: RwLock::new(DocumentSettings::default()),
        }
    }

    /// Settings given to documents opened from now on.
    pub fn with_settings(mut self, settings: DocumentSettings) -> Self {
        self.settings = RwLock::new(settings);
        self
    }

    /// Use `loader` instead of the bundled serde loader.
    pub fn with_loader(mut self, loader: Arc<dyn BlueprintLoader>) -> Self {
        self.documents = DocumentStore::new(loader);
        self
    }

    async fn load_and_publish(&self, uri: Url, text: String, version: Option<i32>) {
        let settings = self.settings.read().await.clone();
        if let Some(state) = self
            .documents
            .upsert(uri.clone(), text, version, settings)
            .await
        {
            self.publish(uri, &state).await;
        }
    }

    async fn publish(&self, uri: Url, state: &DocumentState) {
        let diagnostics = self.features.diagnostics(&state.parsed, &state.settings);
        self.client
            .publish_diagnostics(uri, diagnostics, state.version)
            .await;
    }

    async fn document(&self, uri: &Url) -> Option<Arc<DocumentContext>> {
        self.documents.get(uri).await.map(|state| state.parsed)
    }
}

fn to_location_link(link: DefinitionLink) -> LocationLink {
    LocationLink {
        origin_selection_range: Some(link.origin),
        target_uri: link.target_uri,
        target_range: link.target_range,
        target_selection_range: link.target_range,
    }
}

#[async_trait]
impl<C, P> tower_lsp::LanguageServer for BlueprintLanguageServer<C, P>
where
    C: LspClient,
    P: FeatureProvider,
{
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(true),
                    })),
                    ..TextDocumentSyncOptions::default()
                },
            )),
            completion_provider: Some(LspCompletionOptions {
                trigger_characters: Some(
                    TRIGGER_CHARACTERS.iter().map(|c| c.to_string()).collect(),
                ),
                resolve_provider: Some(true),
                ..LspCompletionOptions::default()
            }),
            definition_provider: Some(OneOf::Left(true)),
            ..ServerCapabilities::default()
        };

        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "blueprint-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("blueprint language server initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let TextDocumentItem {
            uri, text, version, ..
        } = params.text_document;
        self.load_and_publish(uri, text, Some(version)).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        self.features.invalidate(&uri);
        if let Some(change) = params.content_changes.into_iter().last() {
            self.load_and_publish(uri, change.text, Some(params.text_document.version))
                .await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        self.features.invalidate(&uri);
        if let Some(text) = params.text {
            let version = self.documents.get(&uri).await.and_then(|state| state.version);
            self.load_and_publish(uri, text, version).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri).await;
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let updated = {
            let mut current = self.settings.write().await;
            let Some(updated) = current.apply_change(&params.settings) else {
                return;
            };
            *current = updated.clone();
            updated
        };
        debug!(settings = ?updated, "settings changed");
        for (uri, state) in self.documents.reconfigure(&updated).await {
            self.publish(uri, &state).await;
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let position = params.text_document_position;
        let Some(document) = self.document(&position.text_document.uri).await else {
            return Ok(None);
        };
        let list = self
            .features
            .completion(&document, from_protocol(position.position));
        Ok(Some(to_completion_response(list)))
    }

    async fn completion_resolve(&self, item: CompletionItem) -> Result<CompletionItem> {
        Ok(self.features.resolve_completion(item))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params;
        let Some(document) = self.document(&position.text_document.uri).await else {
            warn!(uri = %position.text_document.uri, "definition requested for unknown document");
            return Ok(None);
        };
        Ok(self
            .features
            .definition(&document, from_protocol(position.position))
            .map(|link| GotoDefinitionResponse::Link(vec![to_location_link(link)])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_analysis::test_support::{sample_registries, SAMPLE_YAML};
    use blueprint_analysis::CompletionCandidate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower_lsp::lsp_types::{
        CompletionItemKind, Position, Range, TextDocumentContentChangeEvent,
        TextDocumentIdentifier, TextDocumentPositionParams, VersionedTextDocumentIdentifier,
    };
    use tower_lsp::LanguageServer;

    type Published = Vec<(Url, Vec<Diagnostic>, Option<i32>)>;

    #[derive(Clone, Default)]
    struct RecordingClient {
        published: Arc<Mutex<Published>>,
    }

    impl RecordingClient {
        fn published(&self) -> Published {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LspClient for RecordingClient {
        async fn publish_diagnostics(
            &self,
            uri: Url,
            diagnostics: Vec<Diagnostic>,
            version: Option<i32>,
        ) {
            self.published
                .lock()
                .unwrap()
                .push((uri, diagnostics, version));
        }
    }

    #[derive(Default)]
    struct MockFeatureProvider {
        completion_called: AtomicUsize,
        diagnostics_called: AtomicUsize,
        definition_called: AtomicUsize,
        invalidated: AtomicUsize,
        last_position: Mutex<Option<SourcePosition>>,
        last_problem_limit: Mutex<Option<usize>>,
    }

    impl FeatureProvider for MockFeatureProvider {
        fn completion(&self, _: &DocumentContext, position: SourcePosition) -> CompletionList {
            self.completion_called.fetch_add(1, Ordering::SeqCst);
            *self.last_position.lock().unwrap() = Some(position);
            CompletionList {
                is_incomplete: false,
                items: vec![CompletionCandidate {
                    label: "resources".into(),
                    detail: None,
                    kind: CompletionItemKind::FIELD,
                    insert_text: None,
                    edit: None,
                    filter_text: None,
                    sort_text: None,
                    documentation: None,
                    resolve: None,
                }],
            }
        }

        fn resolve_completion(&self, mut item: CompletionItem) -> CompletionItem {
            item.detail = Some("resolved".into());
            item
        }

        fn diagnostics(&self, _: &DocumentContext, settings: &DocumentSettings) -> Vec<Diagnostic> {
            self.diagnostics_called.fetch_add(1, Ordering::SeqCst);
            *self.last_problem_limit.lock().unwrap() = Some(settings.max_number_of_problems);
            vec![Diagnostic::new_simple(Range::default(), "problem".into())]
        }

        fn definition(
            &self,
            document: &DocumentContext,
            position: SourcePosition,
        ) -> Option<DefinitionLink> {
            self.definition_called.fetch_add(1, Ordering::SeqCst);
            *self.last_position.lock().unwrap() = Some(position);
            Some(DefinitionLink {
                origin: Range::new(Position::new(1, 2), Position::new(1, 5)),
                target_uri: document.uri.clone(),
                target_range: Range::new(Position::new(0, 0), Position::new(0, 3)),
            })
        }

        fn invalidate(&self, _: &Url) {
            self.invalidated.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_uri() -> Url {
        Url::parse("file:///workspace/app.blueprint.yml").unwrap()
    }

    fn mock_server() -> (
        BlueprintLanguageServer<RecordingClient, MockFeatureProvider>,
        RecordingClient,
        Arc<MockFeatureProvider>,
    ) {
        let client = RecordingClient::default();
        let provider = Arc::new(MockFeatureProvider::default());
        let server = BlueprintLanguageServer::with_features(client.clone(), provider.clone());
        (server, client, provider)
    }

    async fn open<C: LspClient, P: FeatureProvider>(
        server: &BlueprintLanguageServer<C, P>,
        uri: Url,
        text: &str,
    ) {
        server
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri,
                    language_id: "yaml".into(),
                    version: 1,
                    text: text.to_string(),
                },
            })
            .await;
    }

    async fn change<C: LspClient, P: FeatureProvider>(
        server: &BlueprintLanguageServer<C, P>,
        text: &str,
    ) {
        server
            .did_change(DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: sample_uri(),
                    version: 2,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: text.to_string(),
                }],
            })
            .await;
    }

    fn completion_params(line: u32, character: u32) -> CompletionParams {
        CompletionParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
                position: Position::new(line, character),
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: None,
        }
    }

    fn definition_params(line: u32, character: u32) -> GotoDefinitionParams {
        GotoDefinitionParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
                position: Position::new(line, character),
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        }
    }

    fn items(response: CompletionResponse) -> Vec<CompletionItem> {
        match response {
            CompletionResponse::List(list) => list.items,
            CompletionResponse::Array(items) => items,
        }
    }

    #[tokio::test]
    async fn initialize_advertises_completion_and_definition() {
        let (server, _, _) = mock_server();
        let result = server.initialize(InitializeParams::default()).await.unwrap();
        let completion = result.capabilities.completion_provider.unwrap();
        assert_eq!(completion.resolve_provider, Some(true));
        assert_eq!(
            completion.trigger_characters.unwrap(),
            vec!["{", ".", "\"", "[", ":", " "]
        );
        assert_eq!(
            result.capabilities.definition_provider,
            Some(OneOf::Left(true))
        );
    }

    #[tokio::test]
    async fn opening_publishes_diagnostics() {
        let (server, client, provider) = mock_server();
        open(&server, sample_uri(), SAMPLE_YAML).await;

        let published = client.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, sample_uri());
        assert_eq!(published[0].1.len(), 1);
        assert_eq!(published[0].2, Some(1));
        assert_eq!(provider.diagnostics_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsupported_documents_are_ignored() {
        let (server, client, provider) = mock_server();
        let uri = Url::parse("file:///workspace/notes.txt").unwrap();
        open(&server, uri, "resources: {}").await;

        assert!(client.published().is_empty());
        assert_eq!(provider.diagnostics_called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn changes_invalidate_and_republish() {
        let (server, client, provider) = mock_server();
        open(&server, sample_uri(), SAMPLE_YAML).await;
        change(&server, "resources: {}\n").await;

        assert_eq!(provider.invalidated.load(Ordering::SeqCst), 1);
        let published = client.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[1].2, Some(2));
        let document = server.document(&sample_uri()).await.unwrap();
        assert_eq!(document.content, "resources: {}\n");
    }

    #[tokio::test]
    async fn failed_loads_keep_the_previous_structure() {
        let (server, _, _) = mock_server();
        open(&server, sample_uri(), SAMPLE_YAML).await;
        change(&server, "resources:\n  orders: [\n").await;

        let document = server.document(&sample_uri()).await.unwrap();
        assert!(document.error.is_some());
        let blueprint = document.blueprint.as_ref().expect("previous blueprint");
        assert!(blueprint.resources.contains_key("ordersTable"));
    }

    #[tokio::test]
    async fn closing_clears_diagnostics_and_state() {
        let (server, client, _) = mock_server();
        open(&server, sample_uri(), SAMPLE_YAML).await;
        server
            .did_close(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
            })
            .await;

        let published = client.published();
        assert_eq!(published.last().unwrap().1, Vec::<Diagnostic>::new());
        assert!(server.document(&sample_uri()).await.is_none());
    }

    #[tokio::test]
    async fn completion_translates_positions() {
        let (server, _, provider) = mock_server();
        open(&server, sample_uri(), SAMPLE_YAML).await;

        let response = server.completion(completion_params(3, 7)).await.unwrap().unwrap();
        assert_eq!(items(response)[0].label, "resources");
        assert_eq!(provider.completion_called.load(Ordering::SeqCst), 1);
        assert_eq!(
            *provider.last_position.lock().unwrap(),
            Some(SourcePosition::new(4, 8))
        );
    }

    #[tokio::test]
    async fn requests_for_unknown_documents_are_empty() {
        let (server, _, provider) = mock_server();
        assert!(server.completion(completion_params(0, 0)).await.unwrap().is_none());
        assert!(server
            .goto_definition(definition_params(0, 0))
            .await
            .unwrap()
            .is_none());
        assert_eq!(provider.completion_called.load(Ordering::SeqCst), 0);
        assert_eq!(provider.definition_called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resolve_goes_through_the_provider() {
        let (server, _, _) = mock_server();
        let item = CompletionItem::new_simple("label".into(), "detail".into());
        let resolved = server.completion_resolve(item).await.unwrap();
        assert_eq!(resolved.detail.as_deref(), Some("resolved"));
    }

    #[tokio::test]
    async fn definitions_are_location_links() {
        let (server, _, provider) = mock_server();
        open(&server, sample_uri(), SAMPLE_YAML).await;

        let response = server
            .goto_definition(definition_params(1, 3))
            .await
            .unwrap()
            .unwrap();
        let GotoDefinitionResponse::Link(links) = response else {
            panic!("expected location links");
        };
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].origin_selection_range,
            Some(Range::new(Position::new(1, 2), Position::new(1, 5)))
        );
        assert_eq!(links[0].target_selection_range, links[0].target_range);
        assert_eq!(provider.definition_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn configuration_changes_republish_open_documents() {
        let (server, client, provider) = mock_server();
        open(&server, sample_uri(), SAMPLE_YAML).await;

        server
            .did_change_configuration(DidChangeConfigurationParams {
                settings: serde_json::json!({ "blueprintLanguageServer": { "maxNumberOfProblems": 5 } }),
            })
            .await;
        assert_eq!(client.published().len(), 2);
        assert_eq!(*provider.last_problem_limit.lock().unwrap(), Some(5));

        server
            .did_change_configuration(DidChangeConfigurationParams {
                settings: serde_json::json!({ "somethingElse": {} }),
            })
            .await;
        assert_eq!(client.published().len(), 2);
    }

    #[tokio::test]
    async fn default_features_complete_and_validate() {
        let client = RecordingClient::default();
        let features = Arc::new(DefaultFeatureProvider::new(
            sample_registries(),
            FeatureOptions::default(),
        ));
        let server = BlueprintLanguageServer::with_features(client.clone(), features);
        open(
            &server,
            sample_uri(),
            "resources:\n  orders:\n    type: aws/dy\n",
        )
        .await;

        let published = client.published();
        assert_eq!(published[0].1.len(), 1);
        assert!(published[0].1[0].message.contains("aws/dy"));

        let response = server.completion(completion_params(2, 16)).await.unwrap().unwrap();
        let items = items(response);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "aws/dynamodb/table");

        let resolved = server.completion_resolve(items[0].clone()).await.unwrap();
        assert!(resolved.documentation.is_some());
    }
}
