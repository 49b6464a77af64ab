use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AppConfig, SettingsStore};
use crate::core::LogRagError;
use crate::embedding::{Embedder, FastEmbedder};
use crate::indexer::LogIndexer;
use crate::llm::{BackendRegistry, GeminiBackend, LlmBackend, OllamaBackend, Provider};
use crate::orchestrator::Orchestrator;
use crate::retrieval::RagEngine;
use crate::server::{start_server, AppState};
use crate::status::StatusTracker;
use crate::store::VectorStore;

/// Wires up the pipeline and serves the HTTP API.
///
/// A log directory persisted from a previous run is re-activated before the
/// server starts accepting requests, so its reindex begins immediately.
pub async fn serve_api(
    host: Option<String>,
    port: Option<u16>,
    config: &AppConfig,
) -> Result<(), LogRagError> {
    let mut config = config.clone();
    if let Some(host) = host {
        config.server_host = host;
    }
    if let Some(port) = port {
        config.server_port = port;
    }

    info!("Loading embedding model '{}'", config.embedding_model);
    let embedder: Arc<dyn Embedder> = Arc::new(FastEmbedder::new(&config.embedding_model)?);
    info!("Embedding model ready ({} dimensions)", embedder.dim());

    let store = Arc::new(VectorStore::new());
    let indexer = Arc::new(LogIndexer::new(store.clone(), embedder.clone()));
    let status = Arc::new(StatusTracker::new());

    let settings_store = Arc::new(SettingsStore::new(config.settings_file()));
    let settings = settings_store.load();

    let orchestrator = Arc::new(Orchestrator::new(indexer, status, settings_store));

    let default_provider = settings
        .llm_provider
        .as_deref()
        .unwrap_or(&config.default_provider)
        .parse::<Provider>()
        .unwrap_or_else(|e| {
            warn!("Ignoring configured provider: {}", e);
            Provider::Local
        });

    let backends = Arc::new(BackendRegistry::new(
        Arc::new(OllamaBackend::new(&config.ollama_host, &config.ollama_model))
            as Arc<dyn LlmBackend>,
        Arc::new(GeminiBackend::new(
            &config.gemini_model,
            config.resolved_gemini_key(),
        )) as Arc<dyn LlmBackend>,
        default_provider,
    ));
    let engine = Arc::new(RagEngine::new(store, embedder, backends));

    if let Some(dir) = &settings.log_directory {
        info!("Restoring persisted log directory: {}", dir);
        if let Err(e) = orchestrator.set_active_directory(dir) {
            warn!("Persisted log directory no longer valid: {}", e);
        }
    }

    let state = AppState {
        orchestrator,
        engine,
        raw_line_limit: config.raw_line_limit,
    };

    start_server(&config, state).await
}
