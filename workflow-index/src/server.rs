//! HTTP API over a [`WorkflowIndex`].
//!
//! Every handler is a thin mapping from one index operation to a JSON body.
//! Errors leave through [`error_response`], which logs the full error and
//! returns only [`IndexError::external_message`] to the client.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path as UrlPath, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use workflow_index_core::{IndexError, WorkflowIndex};

use crate::load_config::{AppConfig, ServerConfig};

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<WorkflowIndex>,
}

fn error_response(e: IndexError) -> Response {
    let status = match e {
        IndexError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::NOT_FOUND {
        warn!(error = %e, "Request for unknown workflow");
    } else {
        error!(error = ?e, "API error");
    }
    (
        status,
        Json(json!({ "success": false, "error": e.external_message() })),
    )
        .into_response()
}

/// Allowed origins come from `CORS_ORIGINS` (comma separated). Outside
/// production an unset list allows any origin.
pub fn create_cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = std::env::var("CORS_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() && !server.is_production() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflow/:filename", get(get_workflow))
        .route("/api/repo-info", get(repo_info))
        .route("/api/structure", get(structure))
        .route("/api/categories", get(categories))
        .route("/api/health", get(health))
        .route("/api/clear-cache", post(clear_cache))
        .route("/api/debug", get(debug))
}

/// Full application router. Non-API paths fall through to `public_dir` when set.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let mut router = create_api_routes().with_state(state);
    if let Some(dir) = &server.public_dir {
        info!(public_dir = ?dir, "Serving static files");
        router = router.fallback_service(ServeDir::new(dir));
    }
    router
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(server))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(alias = "search")]
    q: Option<String>,
}

async fn list_workflows(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    let listing = match state.index.list_workflows(params.q.as_deref()).await {
        Ok(listing) => listing,
        Err(e) => return error_response(e),
    };
    let mut body = json!({
        "success": true,
        "count": listing.workflows.len(),
        "total": listing.total,
        "workflows": listing.workflows,
        "cached": listing.cached,
        "cache_age": listing.cache_age_seconds,
        "repository": state.index.config().repository.full_name(),
        "categories": listing.categories,
        "structure": listing.structure,
    });
    if listing.stale {
        body["stale"] = json!(true);
    }
    if let Some(error) = listing.error {
        body["error"] = json!(error);
    }
    Json(body).into_response()
}

async fn get_workflow(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Response {
    match state.index.get_workflow(&filename).await {
        Ok(workflow) => Json(json!({ "success": true, "workflow": workflow })).into_response(),
        Err(e) => error_response(e),
    }
}

async fn repo_info(State(state): State<AppState>) -> Response {
    match state.index.get_repository_info().await {
        Ok(repo) => Json(json!({ "success": true, "repo": repo })).into_response(),
        Err(e) => error_response(e),
    }
}

async fn structure(State(state): State<AppState>) -> Response {
    match state.index.get_structure_report().await {
        Ok(report) => Json(json!({
            "success": true,
            "repository": report.repository,
            "structure": report.structure,
            "total_files": report.total_files,
            "sample_files": report.sample_files,
            "failed_folders": report.failed_folders,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn categories(State(state): State<AppState>) -> Response {
    match state.index.categories().await {
        Ok(report) => Json(json!({
            "success": true,
            "categories": report.categories,
            "available": report.available,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.index.health().await;
    Json(json!({
        "status": report.status,
        "timestamp": report.timestamp.to_rfc3339(),
        "cache_status": report.cache_status,
        "cache_age": report.cache_age_seconds,
        "cached_workflows": report.cached_workflows,
        "ttl_seconds": report.ttl_seconds,
        "repository": report.repository,
    }))
}

async fn clear_cache(State(state): State<AppState>) -> impl IntoResponse {
    state.index.clear_cache().await;
    Json(json!({ "success": true, "message": "Cache cleared" }))
}

async fn debug(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.index.debug_report().await)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = ?e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

/// Builds the index from `config` and serves the API until Ctrl-C.
/// Socket address to bind. The host is an IPv4 or IPv6 literal; IPv6 may be
/// written with or without brackets.
pub fn listen_addr(server: &ServerConfig) -> Result<SocketAddr> {
    let host = server.host.trim();
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid listen host {:?}", server.host))?;
    Ok(SocketAddr::new(ip, server.port))
}

pub async fn serve(config: AppConfig) -> Result<()> {
    if let Some(dir) = &config.server.public_dir {
        validate_public_dir(dir)?;
    }
    let index = WorkflowIndex::from_config(config.index.clone())
        .context("Failed to build workflow index")?;
    let state = AppState {
        index: Arc::new(index),
    };
    let router = create_router(state, &config.server);

    let addr = listen_addr(&config.server)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        %addr,
        environment = %config.server.environment,
        repository = %config.index.repository.full_name(),
        "Workflow index listening"
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

/// Checks that a static directory exists before it is handed to [`create_router`].
pub fn validate_public_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("public_dir {:?} is not a directory", dir))
    }
}
