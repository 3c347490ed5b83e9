//! HTTP surface
//!
//! `POST /process` runs a prompt against previously uploaded files,
//! `GET /download/:filename` streams a produced artifact.

use anyhow::Context;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

use crate::error::KiruError;
use crate::workflow::Workflow;

#[derive(Clone)]
struct AppState {
    workflow: Arc<Workflow>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub prompt: String,
    pub file_paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub nlp_response: String,
    pub output_paths: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn build_router(workflow: Arc<Workflow>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/process", post(process))
        .route("/download/:filename", get(download))
        .with_state(AppState { workflow })
}

pub async fn run_server(workflow: Arc<Workflow>, listen: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(workflow);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .context("bind server listener failed")?;
    info!("kiru listening on http://{}", listen);
    axum::serve(listener, app)
        .await
        .context("server terminated with error")
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status":"ok"}))
}

async fn process(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let Json(payload) = payload
        .map_err(|rejection| map_error(KiruError::Validation(rejection.body_text())))?;

    let outcome = state
        .workflow
        .process(&payload.prompt, &payload.file_paths)
        .await
        .map_err(map_error)?;

    Ok(Json(ProcessResponse {
        success: true,
        nlp_response: outcome.narrative,
        output_paths: outcome.artifacts.into_iter().map(|a| a.name).collect(),
    }))
}

async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.workflow.registry().resolve(&filename).map_err(map_error)?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        warn!("Failed to open artifact {}: {}", filename, e);
        map_error(KiruError::NotFound(format!("artifact not found: {}", filename)))
    })?;

    let headers = [
        (header::CONTENT_TYPE, content_type(&filename).to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

fn content_type(filename: &str) -> &'static str {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

fn map_error(err: KiruError) -> ApiError {
    let status = match &err {
        KiruError::Validation(_) | KiruError::UnsupportedAction(_) => StatusCode::BAD_REQUEST,
        KiruError::Interpretation(_) => StatusCode::BAD_GATEWAY,
        KiruError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        KiruError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }

    (
        status,
        Json(ErrorBody {
            success: false,
            error: err.to_string(),
            code: err.kind().to_string(),
        }),
    )
}
