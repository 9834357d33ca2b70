//! REST surface: statement upload/download and filtered transaction queries.
//!
//! | Failure | Status |
//! |---|---|
//! | `NotFound` | 404 |
//! | `InvalidFilter`, `InvalidPeriod`, malformed upload | 400 |
//! | body over [`MAX_UPLOAD_BYTES`] | 413 |
//! | `ParseFailed` | 502 |
//! | anything else | 500 |

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::error;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ingestion::{IngestionPipeline, StatementParser};
use crate::query::{QueryResolver, TransactionFilter};
use crate::schema::{PeriodKey, Transaction};
use crate::storage::StorageBackend;

/// Multipart field carrying the uploaded statement.
pub const STATEMENT_FIELD: &str = "statement";

/// Largest request body accepted, sized for multi-page scanned statements.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pipeline: IngestionPipeline,
}

impl AppState {
    pub fn new(storage: Arc<dyn StorageBackend>, parser: Arc<dyn StatementParser>) -> Self {
        Self {
            pipeline: IngestionPipeline::new(storage, parser),
        }
    }

    fn storage(&self) -> &dyn StorageBackend {
        self.pipeline.storage().as_ref()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub bank_name: String,
    pub year: i32,
    pub month: u32,
    pub transaction_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    BadRequest(String),
    Upload(MultipartError),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::InvalidFilter(_) | LedgerError::InvalidPeriod(_) => StatusCode::BAD_REQUEST,
        LedgerError::ParseFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Upload(err) => (err.status(), err.body_text()),
            ApiError::Ledger(err) => {
                let status = status_for(&err);
                let detail = match &err {
                    LedgerError::NotFound(_) => "Cannot find requested file".to_string(),
                    e if e.is_client_error() => e.to_string(),
                    LedgerError::ParseFailed(_) => "Statement could not be parsed".to_string(),
                    _ => {
                        error!("Request failed: {}", err);
                        "Internal server error".to_string()
                    }
                };
                (status, detail)
            }
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route(
            "/statements/:bank_name/:year/:month",
            get(get_statement).post(upload_statement),
        )
        .route("/transactions", get(get_transactions))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// GET / - Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "running" }))
}

/// POST /statements/:bank_name/:year/:month - Store and parse a statement
async fn upload_statement(
    State(state): State<AppState>,
    Path((bank_name, year, month)): Path<(String, i32, u32)>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let key = PeriodKey::new(bank_name, year, month)?;

    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::Upload)?
    {
        if field.name() == Some(STATEMENT_FIELD) {
            let bytes = field.bytes().await.map_err(ApiError::Upload)?;
            document = Some(bytes);
            break;
        }
    }
    let document = document.ok_or_else(|| {
        ApiError::BadRequest(format!("missing '{}' file field", STATEMENT_FIELD))
    })?;

    let transaction_count = state.pipeline.ingest(&key, &document).await?;

    Ok(Json(UploadResponse {
        bank_name: key.bank_name().to_string(),
        year: key.year(),
        month: key.month(),
        transaction_count,
    }))
}

/// GET /statements/:bank_name/:year/:month - Download the raw statement
async fn get_statement(
    State(state): State<AppState>,
    Path((bank_name, year, month)): Path<(String, i32, u32)>,
) -> Result<Response, ApiError> {
    let key = PeriodKey::new(bank_name, year, month)?;
    let bytes = state.storage().get_raw_document(&key)?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response())
}

/// GET /transactions?bank_name=&year=&month= - Filtered transactions, date ascending
async fn get_transactions(
    State(state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let transactions = QueryResolver::new(state.storage()).resolve(&filter)?;
    Ok(Json(transactions))
}
