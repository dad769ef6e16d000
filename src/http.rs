use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analytics::{self, EvaluationAnalytics, ProposalAnalytics};
use crate::error::{ImportError, StoreError};
use crate::import::{import_bytes, ImportOutcome};
use crate::models::{RecordFilter, SurveyKind};
use crate::repository::Repository;

/// Survey exports are small, but the default 2 MB multipart limit is too tight for xlsx files
/// with embedded images.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Import(ImportError),
    Store(StoreError),
    BadRequest(String),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::Import(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Import(err) if err.is_client_error() => {
                warn!("import rejected: {}", err);
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Import(err) => {
                error!("import failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Store(err) => {
                error!("storage error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch analytics".to_string(),
                )
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub cycle_id: Option<String>,
    pub role: Option<String>,
    pub university: Option<String>,
    pub program: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AnalyticsQuery {
    pub fn into_filter(self) -> Result<RecordFilter, ApiError> {
        let cycle_id = match non_empty(self.cycle_id) {
            Some(raw) => Some(
                Uuid::parse_str(&raw)
                    .map_err(|_| ApiError::BadRequest(format!("Invalid cycleId: {raw}")))?,
            ),
            None => None,
        };
        Ok(RecordFilter {
            cycle_id,
            role: non_empty(self.role),
            university: non_empty(self.university),
            program: non_empty(self.program),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<u8>, ApiError> {
    let mut multipart = multipart.map_err(|_| ImportError::NoFile)?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let bytes = field.bytes().await?;
            return Ok(bytes.to_vec());
        }
    }
    Err(ImportError::NoFile.into())
}

async fn import_upload(
    state: &AppState,
    kind: SurveyKind,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportOutcome>, ApiError> {
    let bytes = read_upload(multipart).await?;
    info!("{} upload received: {} bytes", kind.label(), bytes.len());
    let outcome = import_bytes(state.repo.as_ref(), kind, &bytes).await?;
    Ok(Json(outcome))
}

pub async fn import_evaluation(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportOutcome>, ApiError> {
    import_upload(&state, SurveyKind::Evaluation, multipart).await
}

pub async fn import_proposals(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportOutcome>, ApiError> {
    import_upload(&state, SurveyKind::Proposals, multipart).await
}

pub async fn evaluation_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<EvaluationAnalytics>, ApiError> {
    let mut filter = query.into_filter()?;
    filter.program = None;
    let payload = analytics::evaluation_analytics(state.repo.as_ref(), &filter).await?;
    Ok(Json(payload))
}

pub async fn proposal_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<ProposalAnalytics>, ApiError> {
    let mut filter = query.into_filter()?;
    filter.role = None;
    filter.university = None;
    let payload = analytics::proposal_analytics(state.repo.as_ref(), &filter).await?;
    Ok(Json(payload))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/evaluation-survey/import", post(import_evaluation))
        .route("/api/evaluation-survey/analytics", get(evaluation_analytics))
        .route("/api/proposals-feedback/import", post(import_proposals))
        .route("/api/proposals-feedback/analytics", get(proposal_analytics))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
