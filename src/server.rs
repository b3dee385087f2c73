//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/upload/` | Multipart PDF upload (field `file`) |
//! | `POST` | `/ask/` | JSON `{filename, question}` → `{question, answer}` |
//! | `GET`  | `/documents/{id}` | Stored upload metadata |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `/upload` and `/ask` are also routed without the trailing slash.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "PDF content not found. Please upload the PDF first." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `payload_too_large` (413),
//! `extraction_failed` (500), `storage_error` (500), `upstream_error` (502).
//!
//! # CORS
//!
//! Only `[server].allowed_origin` may make cross-origin calls. Methods and
//! headers are mirrored from the preflight, and credentials are allowed.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::cache::InMemoryTextCache;
use crate::config::{Config, ServerConfig};
use crate::extract::PdfExtractor;
use crate::models::{AskResponse, DocumentMetadata, QuestionRequest, UploadResponse};
use crate::qa::GeminiProvider;
use crate::service::{PdfChatService, ServiceError};
use crate::store::SqliteDocumentStore;
use crate::{db, migrate};

/// Multipart field carrying the PDF.
const FILE_FIELD: &str = "file";

#[derive(Clone)]
struct AppState {
    service: Arc<PdfChatService>,
}

/// Wires the production collaborators and serves until the process exits.
///
/// Fails before binding if the QA API key is missing.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let qa = GeminiProvider::from_env(&config.qa)?;

    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;

    let service = PdfChatService::new(
        Arc::new(SqliteDocumentStore::new(pool)),
        Arc::new(PdfExtractor),
        Arc::new(qa),
        Arc::new(InMemoryTextCache::new()),
        config.uploads.dir.clone(),
    );

    let app = router(Arc::new(service), &config.server)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    tracing::info!(
        bind = %config.server.bind,
        origin = %config.server.allowed_origin,
        upload_dir = %config.uploads.dir.display(),
        model = %config.qa.model,
        "pdf-chat listening"
    );
    println!("pdf-chat listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the router over an already-wired service.
pub fn router(service: Arc<PdfChatService>, server: &ServerConfig) -> anyhow::Result<Router> {
    let origin: HeaderValue = server
        .allowed_origin
        .parse()
        .with_context(|| format!("Invalid allowed_origin: {}", server.allowed_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let app = Router::new()
        .route("/upload/", post(handle_upload))
        .route("/upload", post(handle_upload))
        .route("/ask/", post(handle_ask))
        .route("/ask", post(handle_ask))
        .route("/documents/{id}", get(handle_get_document))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors)
        .with_state(AppState { service });

    Ok(app)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

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

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let (status, code) = match &err {
            ServiceError::InvalidFilename(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServiceError::Extraction(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "extraction_failed")
            }
            ServiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            ServiceError::UpstreamQa(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
        };
        AppError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

/// Multipart read failures keep axum's status (413 when the body limit is hit).
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
        message: err.body_text(),
    }
}

// ============ GET /health ============

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

// ============ POST /upload/ ============

/// Reads the `file` field, ignoring any other fields, and hands it to
/// [`PdfChatService::upload`].
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| bad_request("file field has no filename"))?;
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, data.to_vec()));
    }

    let (filename, data) =
        upload.ok_or_else(|| bad_request(format!("missing multipart field '{}'", FILE_FIELD)))?;

    let response = state.service.upload(&filename, &data).await?;
    Ok(Json(response))
}

// ============ POST /ask/ ============

async fn handle_ask(
    State(state): State<AppState>,
    body: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(request) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    let response = state.service.ask(request).await?;
    Ok(Json(response))
}

// ============ GET /documents/{id} ============

async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentMetadata>, AppError> {
    let doc = state.service.document(&id).await?;
    Ok(Json(doc))
}
