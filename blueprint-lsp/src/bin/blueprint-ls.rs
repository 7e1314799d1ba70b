use std::path::PathBuf;
use std::sync::Arc;

use blueprint_analysis::{InMemoryRegistry, Registries};
use blueprint_lsp::features::settings::DocumentSettings;
use blueprint_lsp::{BlueprintLanguageServer, DefaultFeatureProvider, FeatureOptions};
use clap::Parser;
use tokio::io::{stdin, stdout};
use tower_lsp::{LspService, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Language server for blueprint documents, speaking LSP over stdin/stdout.
#[derive(Debug, Parser)]
#[command(name = "blueprint-ls", version, about)]
struct Args {
    /// Configuration file layered over the built-in defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let mut loader = blueprint_config::Loader::new();
    if let Some(path) = &args.config {
        loader = loader.with_file(path);
    }
    let config = match loader.build() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("blueprint-ls: invalid configuration: {err}");
            std::process::exit(2);
        }
    };
    init_tracing(&config.logging.filter);

    let registries = Registries::from_memory(InMemoryRegistry::with_core_functions());
    let features = Arc::new(DefaultFeatureProvider::new(
        registries,
        FeatureOptions::from_config(&config),
    ));
    let settings = DocumentSettings::from_config(&config);
    info!(config = ?args.config, "starting blueprint language server");

    let (service, socket) = LspService::new(move |client| {
        BlueprintLanguageServer::with_features(client, features.clone())
            .with_settings(settings.clone())
    });
    Server::new(stdin(), stdout(), socket).serve(service).await;
    info!("client connection closed");
}
