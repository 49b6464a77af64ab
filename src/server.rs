use crate::config::AppConfig;
use crate::core::LogRagError;
use crate::llm::Provider;
use crate::orchestrator::Orchestrator;
use crate::retrieval::RagEngine;
use crate::status::IndexingStatus;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub engine: Arc<RagEngine>,
    pub raw_line_limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct LogsRequest {
    pub filename: String,
    #[serde(default, rename = "filterTerm")]
    pub filter_term: String,
}

#[derive(Debug, Deserialize)]
pub struct LogDirRequest {
    pub log_directory: String,
}

#[derive(Debug, Serialize)]
pub struct LogDirResponse {
    pub log_directory: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderRequest {
    pub llm_provider: String,
}

#[derive(Debug, Serialize)]
pub struct ProviderResponse {
    pub llm_provider: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub filename: String,
    pub llm_provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub text: String,
}

pub async fn start_server(
    config: &AppConfig,
    state: AppState,
) -> Result<(), LogRagError> {
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .map_err(|e| LogRagError::Validation(format!("invalid listen address: {}", e)))?;
    info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(LogRagError::Io)?;

    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/files", get(files_handler))
        .route("/api/logs", post(logs_handler))
        .route("/api/log_dir", get(get_log_dir_handler).post(set_log_dir_handler))
        .route("/api/indexing_status", get(indexing_status_handler))
        .route(
            "/api/llm_provider",
            get(get_provider_handler).post(set_provider_handler),
        )
        .route("/api/chat", post(chat_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn files_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, LogRagError> {
    Ok(Json(state.orchestrator.list_files()?))
}

async fn logs_handler(
    State(state): State<AppState>,
    Json(payload): Json<LogsRequest>,
) -> Result<Json<Vec<String>>, LogRagError> {
    let lines = state.orchestrator.read_lines(
        &payload.filename,
        &payload.filter_term,
        state.raw_line_limit,
    )?;
    Ok(Json(lines))
}

async fn get_log_dir_handler(State(state): State<AppState>) -> Json<LogDirResponse> {
    Json(LogDirResponse {
        log_directory: state
            .orchestrator
            .active_directory()
            .map(|p| p.display().to_string()),
    })
}

async fn set_log_dir_handler(
    State(state): State<AppState>,
    Json(payload): Json<LogDirRequest>,
) -> Result<Json<LogDirResponse>, LogRagError> {
    state
        .orchestrator
        .set_active_directory(&payload.log_directory)?;
    Ok(Json(LogDirResponse {
        log_directory: state
            .orchestrator
            .active_directory()
            .map(|p| p.display().to_string()),
    }))
}

async fn indexing_status_handler(State(state): State<AppState>) -> Json<IndexingStatus> {
    Json(state.orchestrator.indexing_status())
}

async fn get_provider_handler(State(state): State<AppState>) -> Json<ProviderResponse> {
    Json(ProviderResponse {
        llm_provider: state.engine.backends().default_provider().as_str().to_string(),
    })
}

async fn set_provider_handler(
    State(state): State<AppState>,
    Json(payload): Json<ProviderRequest>,
) -> Result<Json<ProviderResponse>, LogRagError> {
    let provider: Provider = payload
        .llm_provider
        .parse()
        .map_err(LogRagError::Backend)?;
    state.engine.backends().set_default(provider);
    state.orchestrator.persist_provider(provider.as_str());
    Ok(Json(ProviderResponse {
        llm_provider: provider.as_str().to_string(),
    }))
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, LogRagError> {
    let text = state
        .engine
        .answer(
            &payload.prompt,
            &payload.filename,
            payload.llm_provider.as_deref(),
        )
        .await?;
    Ok(Json(ChatResponse { text }))
}
