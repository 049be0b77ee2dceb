//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Liveness message |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/summarize` | Multipart upload (`file`, `tags`, `project`); returns immediately |
//! | `GET`  | `/summaries` | Metadata of every job, in submission order |
//! | `GET`  | `/summaries/{id}` | Metadata + summary, or the job's current status |
//! | `GET`  | `/download/{id}` | The summary as a `text/markdown` attachment |
//!
//! # Job lookup bodies
//!
//! Job lookups keep the legacy body shapes:
//!
//! ```json
//! { "meta": { ... }, "summary": "# Summary of ..." }
//! { "status": "Processing" }
//! { "status": "Failed", "error": "PDF extraction failed: ..." }
//! { "error": "Summary not found" }
//! ```
//!
//! Unknown ids answer `200` unless `server.strict_status` is set, in which
//! case they answer `404` with the same body.
//!
//! # Error Contract
//!
//! Request validation failures use the structured envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "missing required field: file" } }
//! ```
//!
//! Error codes: `bad_request` (400), `payload_too_large` (413), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser frontend on
//! another origin can upload directly.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::{Config, ServerConfig};
use crate::extract::{PdfExtractor, TextExtractor};
use crate::jobs::{DownloadView, JobView, Summarizer};
use crate::models::JobMetadata;

const NOT_FOUND_MESSAGE: &str = "Summary not found";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    summarizer: Summarizer,
    /// Answer unknown ids with 404 instead of 200.
    strict_status: bool,
}

/// Starts the HTTP server with the default PDF extractor.
///
/// Binds to `[server].bind`, creates the storage directories, and serves
/// until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    run_server_with_extractor(config, Arc::new(PdfExtractor)).await
}

/// Starts the HTTP server with a caller-supplied text extractor.
///
/// # Example
///
/// ```rust,no_run
/// use odessa::extract::PdfExtractor;
/// use odessa::server::run_server_with_extractor;
/// use std::sync::Arc;
///
/// # async fn example(config: &odessa::config::Config) -> anyhow::Result<()> {
/// run_server_with_extractor(config, Arc::new(PdfExtractor)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server_with_extractor(
    config: &Config,
    extractor: Arc<dyn TextExtractor>,
) -> anyhow::Result<()> {
    let summarizer = Summarizer::from_config(config, extractor);
    summarizer.storage().ensure_dirs()?;

    let app = build_router(summarizer, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        uploads = %config.storage.upload_dir.display(),
        summaries = %config.storage.summary_dir.display(),
        max_concurrent = config.jobs.max_concurrent,
        "Odessa server listening on http://{}",
        config.server.bind
    );
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router around an existing [`Summarizer`].
pub fn build_router(summarizer: Summarizer, server: &ServerConfig) -> Router {
    let state = AppState {
        summarizer,
        strict_status: server.strict_status,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/summarize", post(handle_summarize))
        .route("/summaries", get(handle_list))
        .route("/summaries/{id}", get(handle_get))
        .route("/download/{id}", get(handle_download))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Multipart failures carry their own status (413 when the body limit is hit).
fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    let status = err.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "payload_too_large"
    } else {
        "bad_request"
    };
    AppError {
        status,
        code: code.to_string(),
        message: format!("invalid multipart upload: {}", err.body_text()),
    }
}

impl AppState {
    fn not_found(&self) -> Response {
        let status = if self.strict_status {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        };
        (status, Json(json!({ "error": NOT_FOUND_MESSAGE }))).into_response()
    }
}

// ============ GET / and GET /health ============

async fn handle_root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Odessa Pro API is live" }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /summarize ============

#[derive(Serialize)]
struct SubmitResponse {
    id: String,
    message: String,
    meta: JobMetadata,
}

/// Handler for `POST /summarize`.
///
/// Reads the whole upload, saves it, registers the job, and answers
/// before any extraction happens. `file` is required; `tags` is a
/// comma-separated string and `project` defaults to `"Default"`.
async fn handle_summarize(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut tags = String::new();
    let mut project: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some((filename, bytes.to_vec()));
            }
            "tags" => tags = field.text().await.map_err(multipart_error)?,
            "project" => project = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| bad_request("missing required field: file"))?;

    let submission = state
        .summarizer
        .submit(&bytes, &filename, &tags, project.as_deref())
        .await
        .map_err(|e| internal(format!("failed to store upload: {:#}", e)))?;

    Ok(Json(SubmitResponse {
        id: submission.id,
        message: "Summary is being processed.".to_string(),
        meta: submission.meta,
    }))
}

// ============ GET /summaries ============

async fn handle_list(State(state): State<AppState>) -> Json<Vec<JobMetadata>> {
    Json(state.summarizer.list())
}

// ============ GET /summaries/{id} ============

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let view = state
        .summarizer
        .get(&id)
        .await
        .map_err(|e| internal(format!("{:#}", e)))?;

    Ok(match view {
        JobView::NotFound => state.not_found(),
        JobView::Processing { .. } => Json(json!({ "status": "Processing" })).into_response(),
        JobView::Failed { error, .. } => {
            Json(json!({ "status": "Failed", "error": error })).into_response()
        }
        JobView::Complete { meta, summary } => {
            Json(json!({ "meta": meta, "summary": summary })).into_response()
        }
    })
}

// ============ GET /download/{id} ============

async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    Ok(match state.summarizer.download(&id).await {
        DownloadView::NotFound => state.not_found(),
        DownloadView::Processing => Json(json!({ "status": "Processing" })).into_response(),
        DownloadView::Failed { error } => {
            Json(json!({ "status": "Failed", "error": error })).into_response()
        }
        DownloadView::Ready {
            path,
            download_name,
        } => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| internal(format!("failed to read {}: {}", path.display(), e)))?;
            (
                [
                    (
                        header::CONTENT_TYPE,
                        "text/markdown; charset=utf-8".to_string(),
                    ),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", download_name),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
    })
}
